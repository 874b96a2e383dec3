//! Hardware register names for the I/O area.
//!
//! Labels are written straight into the I/O pages, so they exist even while
//! the CPU port has character ROM or RAM banked in at $D000.

use code_analysis::{CodeAnalysisState, LabelType, PageId};

/// VIC-II registers at $D000.
const VIC_REGISTERS: &[(u16, &str)] = &[
    (0xD000, "VIC_Sprite0X"),
    (0xD001, "VIC_Sprite0Y"),
    (0xD002, "VIC_Sprite1X"),
    (0xD003, "VIC_Sprite1Y"),
    (0xD004, "VIC_Sprite2X"),
    (0xD005, "VIC_Sprite2Y"),
    (0xD006, "VIC_Sprite3X"),
    (0xD007, "VIC_Sprite3Y"),
    (0xD008, "VIC_Sprite4X"),
    (0xD009, "VIC_Sprite4Y"),
    (0xD00A, "VIC_Sprite5X"),
    (0xD00B, "VIC_Sprite5Y"),
    (0xD00C, "VIC_Sprite6X"),
    (0xD00D, "VIC_Sprite6Y"),
    (0xD00E, "VIC_Sprite7X"),
    (0xD00F, "VIC_Sprite7Y"),
    (0xD010, "VIC_SpriteXMSB"),
    (0xD011, "VIC_ControlReg1"),
    (0xD012, "VIC_Raster"),
    (0xD013, "VIC_LightPenX"),
    (0xD014, "VIC_LightPenY"),
    (0xD015, "VIC_SpriteEnable"),
    (0xD016, "VIC_ControlReg2"),
    (0xD017, "VIC_SpriteYExpand"),
    (0xD018, "VIC_MemoryPointers"),
    (0xD019, "VIC_InterruptStatus"),
    (0xD01A, "VIC_InterruptEnable"),
    (0xD01B, "VIC_SpritePriority"),
    (0xD01C, "VIC_SpriteMulticolour"),
    (0xD01D, "VIC_SpriteXExpand"),
    (0xD01E, "VIC_SpriteSpriteCollision"),
    (0xD01F, "VIC_SpriteBackgroundCollision"),
    (0xD020, "VIC_BorderColour"),
    (0xD021, "VIC_BackgroundColour0"),
    (0xD022, "VIC_BackgroundColour1"),
    (0xD023, "VIC_BackgroundColour2"),
    (0xD024, "VIC_BackgroundColour3"),
    (0xD025, "VIC_SpriteMulticolour0"),
    (0xD026, "VIC_SpriteMulticolour1"),
    (0xD027, "VIC_Sprite0Colour"),
    (0xD028, "VIC_Sprite1Colour"),
    (0xD029, "VIC_Sprite2Colour"),
    (0xD02A, "VIC_Sprite3Colour"),
    (0xD02B, "VIC_Sprite4Colour"),
    (0xD02C, "VIC_Sprite5Colour"),
    (0xD02D, "VIC_Sprite6Colour"),
    (0xD02E, "VIC_Sprite7Colour"),
];

/// SID registers at $D400.
const SID_REGISTERS: &[(u16, &str)] = &[
    (0xD400, "SID_Voice1FreqLo"),
    (0xD401, "SID_Voice1FreqHi"),
    (0xD402, "SID_Voice1PulseWidthLo"),
    (0xD403, "SID_Voice1PulseWidthHi"),
    (0xD404, "SID_Voice1Control"),
    (0xD405, "SID_Voice1AttackDecay"),
    (0xD406, "SID_Voice1SustainRelease"),
    (0xD407, "SID_Voice2FreqLo"),
    (0xD408, "SID_Voice2FreqHi"),
    (0xD409, "SID_Voice2PulseWidthLo"),
    (0xD40A, "SID_Voice2PulseWidthHi"),
    (0xD40B, "SID_Voice2Control"),
    (0xD40C, "SID_Voice2AttackDecay"),
    (0xD40D, "SID_Voice2SustainRelease"),
    (0xD40E, "SID_Voice3FreqLo"),
    (0xD40F, "SID_Voice3FreqHi"),
    (0xD410, "SID_Voice3PulseWidthLo"),
    (0xD411, "SID_Voice3PulseWidthHi"),
    (0xD412, "SID_Voice3Control"),
    (0xD413, "SID_Voice3AttackDecay"),
    (0xD414, "SID_Voice3SustainRelease"),
    (0xD415, "SID_FilterCutoffLo"),
    (0xD416, "SID_FilterCutoffHi"),
    (0xD417, "SID_FilterControl"),
    (0xD418, "SID_VolumeFilterMode"),
    (0xD419, "SID_PaddleX"),
    (0xD41A, "SID_PaddleY"),
    (0xD41B, "SID_Voice3Oscillator"),
    (0xD41C, "SID_Voice3Envelope"),
];

/// Register names shared by both CIAs, by offset.
const CIA_REGISTERS: &[(u16, &str)] = &[
    (0x0, "PortA"),
    (0x1, "PortB"),
    (0x2, "DataDirectionA"),
    (0x3, "DataDirectionB"),
    (0x4, "TimerALo"),
    (0x5, "TimerAHi"),
    (0x6, "TimerBLo"),
    (0x7, "TimerBHi"),
    (0x8, "TimeOfDayTenths"),
    (0x9, "TimeOfDaySeconds"),
    (0xA, "TimeOfDayMinutes"),
    (0xB, "TimeOfDayHours"),
    (0xC, "SerialData"),
    (0xD, "InterruptControl"),
    (0xE, "ControlA"),
    (0xF, "ControlB"),
];

const COLOUR_RAM: u16 = 0xD800;

/// Name the VIC-II, SID, colour RAM and CIA registers on the four I/O pages
/// ($D000, $D400, $D800, $DC00).
pub(crate) fn add_io_labels(state: &mut CodeAnalysisState, io: &[PageId]) {
    let &[vic, sid, colour, cia] = io else {
        return;
    };
    for &(address, name) in VIC_REGISTERS {
        state.set_label_for_page_address(vic, address, name, LabelType::Data);
    }
    for &(address, name) in SID_REGISTERS {
        state.set_label_for_page_address(sid, address, name, LabelType::Data);
    }
    state.set_label_for_page_address(colour, COLOUR_RAM, "ColourRAM", LabelType::Data);
    for (base, prefix) in [(0xDC00u16, "CIA1"), (0xDD00, "CIA2")] {
        for &(offset, name) in CIA_REGISTERS {
            let name = format!("{prefix}_{name}");
            state.set_label_for_page_address(cia, base + offset, &name, LabelType::Data);
        }
    }
}
