use ordermachine::cpu::accumulator::{self, Shift};
use ordermachine::cpu::registers::{L_WIDTH, LONG_WIDTH};
use ordermachine::cpu::{Machine, MachineError, StopReason};
use ordermachine::word::bits::{decode_unsigned, encode_unsigned, mask};
use ordermachine::word::Word;
use proptest::prelude::*;

const ACC_MIN: i64 = -(1 << 38);
const ACC_MAX: i64 = (1 << 38) - 1;

fn loaded(value: i64) -> (Word, Word) {
    let mut m = Word::signed_with_overflow(LONG_WIDTH);
    let mut l = Word::unsigned(L_WIDTH);
    accumulator::set_value(&mut m, &mut l, value as i128);
    (m, l)
}

proptest! {
    #[test]
    fn unsigned_words_read_back(width in 1u32..=63, value in 0i64..i64::MAX) {
        let masked = (value as u64 & mask(width)) as i64;
        let word = Word::unsigned(width).with_value(masked);
        prop_assert_eq!(word.to_number(), masked);
    }

    #[test]
    fn unsigned_encoding_round_trips(width in 1u32..=63, value in any::<u64>()) {
        let raw = encode_unsigned(value, width);
        prop_assert!(raw <= mask(width));
        prop_assert_eq!(decode_unsigned(raw, width), value & mask(width));
    }

    #[test]
    fn signed_words_read_back(width in 2u32..=63, value in any::<i64>()) {
        let half = 1i128 << (width - 1);
        let value = (value as i128).rem_euclid(2 * half) - half;
        let word = Word::signed(width).with_value(value as i64);
        prop_assert_eq!(word.to_number() as i128, value);
    }

    #[test]
    fn negative_count_reverses_shift(value in ACC_MIN..=ACC_MAX, count in 0i64..45) {
        let (mut m1, mut l1) = loaded(value);
        let (mut m2, mut l2) = loaded(value);
        let o1 = accumulator::shift(&mut m1, &mut l1, Shift::ArithmeticRight, count);
        let o2 = accumulator::shift(&mut m2, &mut l2, Shift::ArithmeticLeft, -count);
        prop_assert_eq!(o1, o2);
        prop_assert_eq!(accumulator::value(&m1, &l1), accumulator::value(&m2, &l2));

        let (mut m1, mut l1) = loaded(value);
        let (mut m2, mut l2) = loaded(value);
        accumulator::shift(&mut m1, &mut l1, Shift::LogicalLeft, count);
        accumulator::shift(&mut m2, &mut l2, Shift::LogicalRight, -count);
        prop_assert_eq!(accumulator::value(&m1, &l1), accumulator::value(&m2, &l2));
    }

    #[test]
    fn arithmetic_right_divides(value in ACC_MIN..=ACC_MAX, count in 0i64..39) {
        let (mut m, mut l) = loaded(value);
        let overflow = accumulator::shift(&mut m, &mut l, Shift::ArithmeticRight, count);
        prop_assert!(overflow.is_none());
        prop_assert_eq!(accumulator::value(&m, &l), value >> count);
    }

    #[test]
    fn small_values_survive_shift_out_and_back(value in -(1i64 << 19)..(1i64 << 19)) {
        let (mut m, mut l) = loaded(value);
        let left = accumulator::shift(&mut m, &mut l, Shift::ArithmeticLeft, 19);
        let right = accumulator::shift(&mut m, &mut l, Shift::ArithmeticRight, 19);
        prop_assert!(left.is_none() && right.is_none());
        prop_assert!(!m.has_overflowed());
        prop_assert_eq!(accumulator::value(&m, &l), value);
    }

    #[test]
    fn subtract_undoes_add(value in ACC_MIN..=ACC_MAX, raw in 0u64..(1 << 20)) {
        let (mut m, mut l) = loaded(value);
        let s = Word::unsigned(20).with_raw(raw);
        accumulator::add_double(&mut m, &mut l, &s);
        accumulator::subtract_double(&mut m, &mut l, &s);
        prop_assert_eq!(accumulator::value(&m, &l), value);
    }

    #[test]
    fn random_programs_never_panic(
        program in prop::collection::vec(0u64..(1 << 20), 1..200),
        limit in 1u64..2000
    ) {
        let mut machine = Machine::default();
        machine.load_program(0, &program).unwrap();
        match machine.run(limit) {
            Ok(executed) => prop_assert!(executed <= limit),
            Err(MachineError::Stopped(reason)) => {
                prop_assert_eq!(reason, StopReason::Absolute);
                prop_assert_eq!(machine.status.stop_reason, Some(StopReason::Absolute));
            }
        }
        prop_assert!(machine.orders_executed() <= limit);
    }
}
