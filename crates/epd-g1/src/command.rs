//! G1 register command table
//!
//! Every controller access is "write this payload to that register". The
//! set of accesses the driver ever makes is closed, so it is an enum and
//! the table is an exhaustive `match`: adding a [`CommandId`] without an
//! entry does not compile.

use crate::config::PanelSize;
use crate::error::DriverError;

// ---------------------------------------------------------------------------
// Registers
// ---------------------------------------------------------------------------

/// Controller register indexes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Channel select — 8 bytes, active source/gate window per panel size.
    ChannelSelect = 0x01,
    /// Output enable/disable — 1 byte.
    Output = 0x02,
    /// Data latch — 1 byte.
    Latch = 0x03,
    /// Gate/source voltage level, also used for discharge stages — 1 byte.
    GateSourceLevel = 0x04,
    /// Charge pump rail control — 1 byte.
    ChargePump = 0x05,
    /// DC/DC converter frequency — 1 byte.
    DcFrequency = 0x06,
    /// Internal oscillator — 1 byte.
    Oscillator = 0x07,
    /// ADC control — 1 byte.
    Adc = 0x08,
    /// VCOM level — 2 bytes.
    VcomLevel = 0x09,
    /// Line data — streamed, byte-at-a-time with busy handshake.
    Data = 0x0a,
}

impl Register {
    /// Index byte sent after the register header.
    pub const fn index(self) -> u8 {
        self as u8
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Every register write the driver can issue.
///
/// The discriminant is the identifier accepted by
/// [`Controller::dispatch_raw`](crate::Controller::dispatch_raw).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandId {
    /// Channel select, 1.44" panel
    ChannelSelect1_44 = 0,
    /// Channel select, 2" panel
    ChannelSelect2,
    /// Channel select, 2.7" panel
    ChannelSelect2_7,
    /// Output off (0x05)
    OutputOff,
    /// Output disable (0x24), first step of power-down
    OutputDisable,
    /// Output enable (0x2f), last step of bring-up
    OutputEnable,
    /// Latch off
    LatchOff,
    /// Latch on
    LatchOn,
    /// Gate/source level, 1.44" panel
    GateSourceLevel1_44,
    /// Gate/source level, 2" panel
    GateSourceLevel2,
    /// Gate/source level, 2.7" panel
    GateSourceLevel2_7,
    /// Gate/source discharge stage 0
    GateSourceDischarge0,
    /// Gate/source discharge stage 1
    GateSourceDischarge1,
    /// Gate/source discharge stage 2
    GateSourceDischarge2,
    /// Gate/source discharge stage 3
    GateSourceDischarge3,
    /// Charge pump: positive rail on
    ChargePumpPositiveOn,
    /// Charge pump: positive rail off
    ChargePumpPositiveOff,
    /// Charge pump: negative rail on
    ChargePumpNegativeOn,
    /// Charge pump: negative rail off
    ChargePumpNegativeOff,
    /// Charge pump: VCOM rail on
    ChargePumpVcomOn,
    /// Charge pump: VCOM rail off
    ChargePumpVcomOff,
    /// DC/DC frequency setting
    DcFrequency,
    /// Oscillator on
    OscillatorOn,
    /// Oscillator off
    OscillatorOff,
    /// ADC disable
    AdcDisable,
    /// VCOM level
    VcomLevel,
}

impl CommandId {
    /// All identifiers, ordered by discriminant.
    pub const ALL: [CommandId; 26] = [
        Self::ChannelSelect1_44,
        Self::ChannelSelect2,
        Self::ChannelSelect2_7,
        Self::OutputOff,
        Self::OutputDisable,
        Self::OutputEnable,
        Self::LatchOff,
        Self::LatchOn,
        Self::GateSourceLevel1_44,
        Self::GateSourceLevel2,
        Self::GateSourceLevel2_7,
        Self::GateSourceDischarge0,
        Self::GateSourceDischarge1,
        Self::GateSourceDischarge2,
        Self::GateSourceDischarge3,
        Self::ChargePumpPositiveOn,
        Self::ChargePumpPositiveOff,
        Self::ChargePumpNegativeOn,
        Self::ChargePumpNegativeOff,
        Self::ChargePumpVcomOn,
        Self::ChargePumpVcomOff,
        Self::DcFrequency,
        Self::OscillatorOn,
        Self::OscillatorOff,
        Self::AdcDisable,
        Self::VcomLevel,
    ];

    /// Channel-select command for a panel size.
    pub const fn channel_select(size: PanelSize) -> Self {
        match size {
            PanelSize::Inch1_44 => Self::ChannelSelect1_44,
            PanelSize::Inch2 => Self::ChannelSelect2,
            PanelSize::Inch2_7 => Self::ChannelSelect2_7,
        }
    }

    /// Gate/source level command for a panel size.
    pub const fn gate_source_level(size: PanelSize) -> Self {
        match size {
            PanelSize::Inch1_44 => Self::GateSourceLevel1_44,
            PanelSize::Inch2 => Self::GateSourceLevel2,
            PanelSize::Inch2_7 => Self::GateSourceLevel2_7,
        }
    }

    /// Next identifier in discriminant order, `None` after the last.
    ///
    /// Exhaustive, so a new variant cannot compile without being placed in
    /// the chain that the check below compares against [`ALL`](Self::ALL).
    const fn next(self) -> Option<Self> {
        match self {
            Self::ChannelSelect1_44 => Some(Self::ChannelSelect2),
            Self::ChannelSelect2 => Some(Self::ChannelSelect2_7),
            Self::ChannelSelect2_7 => Some(Self::OutputOff),
            Self::OutputOff => Some(Self::OutputDisable),
            Self::OutputDisable => Some(Self::OutputEnable),
            Self::OutputEnable => Some(Self::LatchOff),
            Self::LatchOff => Some(Self::LatchOn),
            Self::LatchOn => Some(Self::GateSourceLevel1_44),
            Self::GateSourceLevel1_44 => Some(Self::GateSourceLevel2),
            Self::GateSourceLevel2 => Some(Self::GateSourceLevel2_7),
            Self::GateSourceLevel2_7 => Some(Self::GateSourceDischarge0),
            Self::GateSourceDischarge0 => Some(Self::GateSourceDischarge1),
            Self::GateSourceDischarge1 => Some(Self::GateSourceDischarge2),
            Self::GateSourceDischarge2 => Some(Self::GateSourceDischarge3),
            Self::GateSourceDischarge3 => Some(Self::ChargePumpPositiveOn),
            Self::ChargePumpPositiveOn => Some(Self::ChargePumpPositiveOff),
            Self::ChargePumpPositiveOff => Some(Self::ChargePumpNegativeOn),
            Self::ChargePumpNegativeOn => Some(Self::ChargePumpNegativeOff),
            Self::ChargePumpNegativeOff => Some(Self::ChargePumpVcomOn),
            Self::ChargePumpVcomOn => Some(Self::ChargePumpVcomOff),
            Self::ChargePumpVcomOff => Some(Self::DcFrequency),
            Self::DcFrequency => Some(Self::OscillatorOn),
            Self::OscillatorOn => Some(Self::OscillatorOff),
            Self::OscillatorOff => Some(Self::AdcDisable),
            Self::AdcDisable => Some(Self::VcomLevel),
            Self::VcomLevel => None,
        }
    }

    /// Table entry for this command.
    pub const fn entry(self) -> CommandEntry {
        lookup(self)
    }

    /// Short name for log output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChannelSelect1_44 => "chansel-1.44",
            Self::ChannelSelect2 => "chansel-2",
            Self::ChannelSelect2_7 => "chansel-2.7",
            Self::OutputOff => "output-off",
            Self::OutputDisable => "output-disable",
            Self::OutputEnable => "output-enable",
            Self::LatchOff => "latch-off",
            Self::LatchOn => "latch-on",
            Self::GateSourceLevel1_44 => "gate-src-level-1.44",
            Self::GateSourceLevel2 => "gate-src-level-2",
            Self::GateSourceLevel2_7 => "gate-src-level-2.7",
            Self::GateSourceDischarge0 => "gate-src-discharge-0",
            Self::GateSourceDischarge1 => "gate-src-discharge-1",
            Self::GateSourceDischarge2 => "gate-src-discharge-2",
            Self::GateSourceDischarge3 => "gate-src-discharge-3",
            Self::ChargePumpPositiveOn => "cp-vpos-on",
            Self::ChargePumpPositiveOff => "cp-vpos-off",
            Self::ChargePumpNegativeOn => "cp-vneg-on",
            Self::ChargePumpNegativeOff => "cp-vneg-off",
            Self::ChargePumpVcomOn => "cp-vcom-on",
            Self::ChargePumpVcomOff => "cp-vcom-off",
            Self::DcFrequency => "dcfreq",
            Self::OscillatorOn => "osc-on",
            Self::OscillatorOff => "osc-off",
            Self::AdcDisable => "adc-disable",
            Self::VcomLevel => "vcom-level",
        }
    }
}

// `ALL` must list every identifier once, at the index equal to its
// discriminant, or `try_from` silently loses the missing ones.
#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]
const _: () = {
    let mut id = Some(CommandId::ChannelSelect1_44);
    let mut i = 0;
    while let Some(current) = id {
        assert!(i < CommandId::ALL.len(), "CommandId::ALL is missing a variant");
        assert!(current as usize == i, "CommandId discriminants are not sequential");
        assert!(CommandId::ALL[i] as usize == i, "CommandId::ALL is out of order");
        id = current.next();
        i += 1;
    }
    assert!(i == CommandId::ALL.len(), "CommandId::ALL has extra entries");
};

impl TryFrom<u8> for CommandId {
    type Error = DriverError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(raw))
            .copied()
            .ok_or(DriverError::InvalidCommand(raw))
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// A register write: target register plus payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    register: Register,
    payload: &'static [u8],
    declared_len: usize,
}

impl CommandEntry {
    /// The declared length is taken from the array type, so it cannot
    /// disagree with the payload.
    const fn new<const N: usize>(register: Register, payload: &'static [u8; N]) -> Self {
        Self {
            register,
            payload,
            declared_len: N,
        }
    }

    /// Target register.
    pub const fn register(&self) -> Register {
        self.register
    }

    /// Payload bytes.
    pub const fn payload(&self) -> &'static [u8] {
        self.payload
    }

    /// Payload length fixed at construction.
    pub const fn declared_len(&self) -> usize {
        self.declared_len
    }
}

/// Resolve a command to its register write. Total over [`CommandId`].
pub const fn lookup(id: CommandId) -> CommandEntry {
    use CommandId as C;
    use Register as R;

    match id {
        C::ChannelSelect1_44 => CommandEntry::new(
            R::ChannelSelect,
            &[0x00, 0x00, 0x00, 0x00, 0x00, 0x0f, 0xff, 0x00],
        ),
        C::ChannelSelect2 => CommandEntry::new(
            R::ChannelSelect,
            &[0x00, 0x00, 0x00, 0x00, 0x01, 0xff, 0xe0, 0x00],
        ),
        C::ChannelSelect2_7 => CommandEntry::new(
            R::ChannelSelect,
            &[0x00, 0x00, 0x00, 0x7f, 0xff, 0xfe, 0x00, 0x00],
        ),
        C::OutputOff => CommandEntry::new(R::Output, &[0x05]),
        C::OutputDisable => CommandEntry::new(R::Output, &[0x24]),
        C::OutputEnable => CommandEntry::new(R::Output, &[0x2f]),
        C::LatchOff => CommandEntry::new(R::Latch, &[0x00]),
        C::LatchOn => CommandEntry::new(R::Latch, &[0x01]),
        C::GateSourceLevel1_44 | C::GateSourceLevel2 => {
            CommandEntry::new(R::GateSourceLevel, &[0x03])
        }
        C::GateSourceLevel2_7 => CommandEntry::new(R::GateSourceLevel, &[0x00]),
        C::GateSourceDischarge0 => CommandEntry::new(R::GateSourceLevel, &[0x00]),
        C::GateSourceDischarge1 => CommandEntry::new(R::GateSourceLevel, &[0x0c]),
        C::GateSourceDischarge2 => CommandEntry::new(R::GateSourceLevel, &[0x50]),
        C::GateSourceDischarge3 => CommandEntry::new(R::GateSourceLevel, &[0xa0]),
        C::ChargePumpPositiveOff => CommandEntry::new(R::ChargePump, &[0x00]),
        C::ChargePumpPositiveOn => CommandEntry::new(R::ChargePump, &[0x01]),
        C::ChargePumpNegativeOff => CommandEntry::new(R::ChargePump, &[0x02]),
        C::ChargePumpNegativeOn => CommandEntry::new(R::ChargePump, &[0x03]),
        C::ChargePumpVcomOn => CommandEntry::new(R::ChargePump, &[0x0f]),
        C::ChargePumpVcomOff => CommandEntry::new(R::ChargePump, &[0x0e]),
        C::DcFrequency => CommandEntry::new(R::DcFrequency, &[0xff]),
        C::OscillatorOn => CommandEntry::new(R::Oscillator, &[0x9d]),
        C::OscillatorOff => CommandEntry::new(R::Oscillator, &[0x0d]),
        C::AdcDisable => CommandEntry::new(R::Adc, &[0x00]),
        C::VcomLevel => CommandEntry::new(R::VcomLevel, &[0xd0, 0x00]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_entry_payload_matches_declared_len() {
        for id in CommandId::ALL {
            let entry = lookup(id);
            assert_eq!(entry.payload().len(), entry.declared_len(), "{}", id.as_str());
            assert!(!entry.payload().is_empty(), "{}", id.as_str());
        }
    }

    #[test]
    fn all_is_ordered_by_discriminant() {
        for (i, id) in CommandId::ALL.iter().enumerate() {
            assert_eq!(usize::from(*id as u8), i);
        }
    }

    #[test]
    fn raw_identifiers_round_trip_through_try_from() {
        for id in CommandId::ALL {
            assert_eq!(CommandId::try_from(id as u8), Ok(id));
        }
    }

    #[test]
    fn raw_identifiers_keep_their_wire_numbering() {
        assert_eq!(CommandId::try_from(0), Ok(CommandId::ChannelSelect1_44));
        assert_eq!(CommandId::try_from(7), Ok(CommandId::LatchOn));
        assert_eq!(CommandId::try_from(15), Ok(CommandId::ChargePumpPositiveOn));
        assert_eq!(CommandId::try_from(16), Ok(CommandId::ChargePumpPositiveOff));
        assert_eq!(CommandId::try_from(17), Ok(CommandId::ChargePumpNegativeOn));
        assert_eq!(CommandId::try_from(18), Ok(CommandId::ChargePumpNegativeOff));
        assert_eq!(CommandId::try_from(25), Ok(CommandId::VcomLevel));
        assert_eq!(lookup(CommandId::ChargePumpPositiveOn).payload(), &[0x01]);
        assert_eq!(lookup(CommandId::ChargePumpNegativeOff).payload(), &[0x02]);
    }

    #[test]
    fn successor_chain_walks_all() {
        let mut walked = vec![CommandId::ChannelSelect1_44];
        while let Some(next) = walked.last().and_then(|id| id.next()) {
            walked.push(next);
        }
        assert_eq!(walked, CommandId::ALL.to_vec());
    }

    #[test]
    fn raw_identifier_outside_set_is_invalid() {
        assert_eq!(CommandId::try_from(26), Err(DriverError::InvalidCommand(26)));
        assert_eq!(CommandId::try_from(0xff), Err(DriverError::InvalidCommand(0xff)));
    }

    #[test]
    fn channel_select_payloads_are_eight_bytes() {
        for size in [PanelSize::Inch1_44, PanelSize::Inch2, PanelSize::Inch2_7] {
            let entry = lookup(CommandId::channel_select(size));
            assert_eq!(entry.register(), Register::ChannelSelect);
            assert_eq!(entry.declared_len(), 8);
        }
    }

    #[test]
    fn register_indexes() {
        assert_eq!(Register::ChannelSelect.index(), 0x01);
        assert_eq!(Register::VcomLevel.index(), 0x09);
        assert_eq!(Register::Data.index(), 0x0a);
    }

    #[test]
    fn rail_commands_hit_the_charge_pump_register() {
        for id in [
            CommandId::ChargePumpPositiveOn,
            CommandId::ChargePumpNegativeOn,
            CommandId::ChargePumpVcomOn,
            CommandId::ChargePumpVcomOff,
            CommandId::ChargePumpNegativeOff,
            CommandId::ChargePumpPositiveOff,
        ] {
            assert_eq!(id.entry().register(), Register::ChargePump);
        }
    }

    #[test]
    fn vcom_level_is_fixed() {
        assert_eq!(lookup(CommandId::VcomLevel).payload(), &[0xd0, 0x00]);
    }
}
