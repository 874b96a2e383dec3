//! Paged RAM keeps its analysis, and saves only load into the same model.

use analysis_spectrum::{SpectrumAnalysis, SpectrumModel};
use code_analysis::{AnalysisError, CodeAnalysisState, LabelType};
use emu_core::testing::{FlatCpu, TestDecoder};

fn spectrum_128k() -> (CodeAnalysisState, SpectrumAnalysis) {
    let mut state = CodeAnalysisState::default();
    let machine = SpectrumAnalysis::new(&mut state, SpectrumModel::Spectrum128K).unwrap();
    (state, machine)
}

#[test]
fn code_in_a_paged_bank_survives_switching() {
    let (mut state, mut machine) = spectrum_128k();
    let mut cpu = FlatCpu::default();
    cpu.load(0xC000, &[0x3E, 0x07, 0xC9]);

    machine.on_port_write(&mut state, 0x7FFD, 0x03);
    state.register_code_executed(&cpu, &TestDecoder, 0xC000, 0xC002);
    state.add_label(0xC000, "bank3_entry", LabelType::Function);

    machine.on_port_write(&mut state, 0x7FFD, 0x04);
    assert!(state.code_info(0xC000).is_none());
    assert!(state.label(0xC000).is_none());

    machine.on_port_write(&mut state, 0x7FFD, 0x03);
    assert_eq!(state.code_info(0xC000).unwrap().byte_size, 2);
    assert_eq!(state.label(0xC000).unwrap().name, "bank3_entry");
}

#[test]
fn session_round_trip_restores_every_bank() {
    let (mut state, mut machine) = spectrum_128k();
    let cpu = FlatCpu::default();
    machine.on_port_write(&mut state, 0x7FFD, 0x06);
    state.add_label(0xC100, "bank6_table", LabelType::Data);
    machine.on_port_write(&mut state, 0x7FFD, 0x00);
    state.add_label(0x8000, "main", LabelType::Function);
    let saved = machine.save_analysis(&state).unwrap();

    assert!(machine.start_session(&mut state, &cpu, &TestDecoder, Some(&saved)));
    assert_eq!(state.label(0x8000).unwrap().name, "main");
    assert!(state.label(0xC100).is_none());
    machine.on_port_write(&mut state, 0x7FFD, 0x06);
    assert_eq!(state.label(0xC100).unwrap().name, "bank6_table");
}

#[test]
fn a_48k_save_does_not_load_into_a_128k() {
    let mut state_48k = CodeAnalysisState::default();
    let machine_48k = SpectrumAnalysis::new(&mut state_48k, SpectrumModel::Spectrum48K).unwrap();
    let saved = machine_48k.save_analysis(&state_48k).unwrap();

    let (mut state, machine) = spectrum_128k();
    state.add_label(0x8000, "kept", LabelType::Code);
    let err = machine.load_analysis(&mut state, &saved).unwrap_err();
    assert!(matches!(err, AnalysisError::PageCountMismatch { .. }));
    assert_eq!(state.label(0x8000).unwrap().name, "kept");
}

#[test]
fn failed_load_seeds_default_labels() {
    let (mut state, mut machine) = spectrum_128k();
    let cpu = FlatCpu::default();
    assert!(!machine.start_session(&mut state, &cpu, &TestDecoder, Some(&[0u8; 3])));
    assert_eq!(state.label(0x5800).unwrap().name, "ScreenAttributes");
    assert_eq!(state.label(0x5C3D).unwrap().name, "ERR_SP");
}
