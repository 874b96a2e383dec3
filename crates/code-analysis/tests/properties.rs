//! Property-based tests for the item list and label naming invariants.

use std::collections::HashSet;

use code_analysis::{
    BusCycle, CodeAnalysisState, DataFormattingOptions, DataType, Item, LabelType, Page, PageId,
};
use emu_core::testing::{FlatCpu, TestDecoder};
use proptest::prelude::*;

const BASE: u16 = 0x8000;

/// Four RAM pages mapped at $8000-$8FFF.
fn small_state() -> (CodeAnalysisState, Vec<PageId>) {
    let mut state = CodeAnalysisState::default();
    let mut ids = Vec::new();
    for i in 0..4usize {
        let id = state
            .register_page(Page::new(BASE + (i as u16) * 0x400), &format!("RAM{i}"))
            .unwrap();
        state.set_read_write_page(32 + i, id, id);
        ids.push(id);
    }
    (state, ids)
}

/// Opcodes the test decoder knows, weighted towards straight-line code.
fn opcode() -> impl Strategy<Value = u8> {
    prop_oneof![
        4 => Just(0x00u8),
        4 => Just(0x3E),
        2 => Just(0x3A),
        2 => Just(0x32),
        1 => Just(0x18),
        1 => Just(0x20),
        1 => Just(0xC3),
        1 => Just(0xCD),
        1 => Just(0xC9),
        2 => any::<u8>(),
    ]
}

fn data_type() -> impl Strategy<Value = DataType> {
    prop_oneof![
        Just(DataType::Byte),
        Just(DataType::Word),
        Just(DataType::Text),
        Just(DataType::Bitmap),
        Just(DataType::CharacterMap),
    ]
}

fn format_options() -> impl Strategy<Value = DataFormattingOptions> {
    (data_type(), 0u16..0x100, 1u16..=8, 1u16..=16).prop_map(
        |(data_type, offset, item_size, item_count)| DataFormattingOptions {
            data_type,
            start_address: BASE + offset,
            item_size,
            item_count,
            ..DataFormattingOptions::default()
        },
    )
}

/// Code and data items in address order never overlap.
fn assert_exclusive(items: &[Item]) -> Result<(), TestCaseError> {
    let mut next_free = 0u32;
    for item in items {
        if !matches!(item, Item::Code { .. } | Item::Data { .. }) {
            continue;
        }
        let start = u32::from(item.address());
        prop_assert!(
            start >= next_free,
            "item at ${:04X} overlaps previous item ending at ${:04X}",
            start,
            next_free
        );
        next_free = start + u32::from(item.byte_size());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: no byte is claimed by both a code item and a data item.
    #[test]
    fn prop_code_and_data_are_exclusive(
        program in prop::collection::vec(opcode(), 1..96),
        formats in prop::collection::vec(format_options(), 0..4),
        entry in 0u16..32,
    ) {
        let (mut state, _) = small_state();
        let mut cpu = FlatCpu::default();
        cpu.load(BASE, &program);
        for options in &formats {
            state.format_data(options);
        }
        state.run_static_code_analysis(&cpu, &TestDecoder, BASE + entry);
        state.update_item_list();
        assert_exclusive(state.item_list())?;
    }

    /// Property: label names stay unique whatever names are asked for.
    #[test]
    fn prop_label_names_are_unique(
        labels in prop::collection::vec((0u16..0x1000, 0usize..3), 1..48),
        removals in prop::collection::vec(0u16..0x1000, 0..8),
    ) {
        let (mut state, _) = small_state();
        let pool = ["Start", "Loop", "Start_1"];
        for (offset, name) in &labels {
            state.add_label(BASE + offset, pool[*name], LabelType::Code);
        }
        for offset in &removals {
            state.remove_label_at_address(BASE + offset);
        }

        let mut seen = HashSet::new();
        for address in BASE..BASE + 0x1000 {
            if let Some(label) = state.label(address) {
                prop_assert!(seen.insert(label.name.clone()), "duplicate name {}", label.name);
                prop_assert!(state.is_label_name_used(&label.name));
            }
        }
    }

    /// Property: formatting the same range twice changes nothing the second time.
    #[test]
    fn prop_format_is_idempotent(options in format_options()) {
        let (mut state, _) = small_state();
        state.format_data(&options);
        state.update_item_list();
        let once = state.item_list().to_vec();

        state.format_data(&options);
        state.force_update_item_list();
        prop_assert_eq!(state.item_list(), once.as_slice());
    }

    /// Property: saving and loading reproduces the item list exactly.
    #[test]
    fn prop_save_load_round_trip(
        program in prop::collection::vec(opcode(), 1..64),
        formats in prop::collection::vec(format_options(), 0..3),
        comments in prop::collection::vec((0u16..0x1000, "[a-z @]{0,12}"), 0..4),
    ) {
        let (mut state, ids) = small_state();
        let mut cpu = FlatCpu::default();
        cpu.load(BASE, &program);
        for options in &formats {
            state.format_data(options);
        }
        state.run_static_code_analysis(&cpu, &TestDecoder, BASE);
        for (offset, text) in &comments {
            state.set_comment_block(BASE + offset, text);
        }
        state.update_item_list();
        let before = state.item_list().to_vec();

        let bytes = state.write_pages(&ids).unwrap();
        state.reset_pages(&ids);
        state.read_pages(&ids, &bytes).unwrap();
        state.update_item_list();
        prop_assert_eq!(state.item_list(), before.as_slice());
    }

    /// Property: once code is written to it stays self-modifying.
    #[test]
    fn prop_self_modifying_is_sticky(offset in 0u16..2, runs in 1usize..4) {
        let (mut state, _) = small_state();
        let mut cpu = FlatCpu::default();
        cpu.load(BASE, &[0x3E, 0x01, 0xC9]);
        state.register_code_executed(&cpu, &TestDecoder, BASE, BASE + 2);

        state.on_bus_cycle(0x8100, BusCycle::write(BASE + offset, 0x02));
        for _ in 0..runs {
            state.register_code_executed(&cpu, &TestDecoder, BASE, BASE + 2);
        }
        prop_assert!(state.code_info(BASE).unwrap().self_modifying);
    }
}
