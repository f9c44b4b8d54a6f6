//! Long living masternode quorum types and their consensus parameters.

pub mod network;

use std::fmt::{Display, Formatter};
use std::io;

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};

use crate::consensus::{Decodable, Encodable, encode};
use crate::prelude::CoreBlockHeight;

/// Timing of the distributed key generation sessions of a quorum type.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct DKGParams {
    /// A new session starts every `interval` blocks.
    pub interval: u32,
    pub phase_blocks: u32,
    pub mining_window_start: u32,
    pub mining_window_end: u32,
    pub bad_votes_threshold: u32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct LLMQParams {
    pub quorum_type: LLMQType,
    pub name: &'static str,
    pub size: u32,
    pub min_size: u32,
    pub threshold: u32,
    pub dkg_params: DKGParams,
    /// How many of the most recent quorums take part in signing.
    pub signing_active_quorum_count: u32,
}

impl LLMQParams {
    /// Members contributed per cycle by a rotating quorum.
    pub fn quarter_size(&self) -> usize {
        self.size as usize / 4
    }
}

const fn dkg(
    interval: u32,
    phase_blocks: u32,
    mining_window_start: u32,
    mining_window_end: u32,
    bad_votes_threshold: u32,
) -> DKGParams {
    DKGParams { interval, phase_blocks, mining_window_start, mining_window_end, bad_votes_threshold }
}

pub const DKG_TEST: DKGParams = dkg(24, 2, 10, 18, 2);
pub const DKG_DEVNET: DKGParams = dkg(24, 2, 10, 18, 7);
pub const DKG_DEVNET_DIP_0024: DKGParams = dkg(48, 2, 10, 18, 7);
pub const DKG_50_60: DKGParams = dkg(24, 2, 10, 18, 40);
pub const DKG_400_60: DKGParams = dkg(24 * 12, 4, 20, 28, 300);
pub const DKG_400_85: DKGParams = dkg(24 * 24, 4, 20, 48, 300);
pub const DKG_100_67: DKGParams = dkg(24, 2, 10, 18, 80);
pub const DKG_60_75: DKGParams = dkg(24 * 12, 2, 42, 50, 48);
pub const DKG_25_67: DKGParams = dkg(24, 2, 10, 18, 22);
pub const DKG_PLATFORM_TESTNET: DKGParams = dkg(24 * 12, 2, 10, 18, 2);
pub const DKG_PLATFORM_DEVNET: DKGParams = dkg(24 * 12, 2, 10, 18, 7);

const fn llmq(
    quorum_type: LLMQType,
    name: &'static str,
    size: u32,
    min_size: u32,
    threshold: u32,
    dkg_params: DKGParams,
    signing_active_quorum_count: u32,
) -> LLMQParams {
    LLMQParams { quorum_type, name, size, min_size, threshold, dkg_params, signing_active_quorum_count }
}

pub const LLMQ_50_60: LLMQParams = llmq(LLMQType::Llmqtype50_60, "llmq_50_60", 50, 40, 30, DKG_50_60, 24);
pub const LLMQ_400_60: LLMQParams =
    llmq(LLMQType::Llmqtype400_60, "llmq_400_60", 400, 300, 240, DKG_400_60, 4);
pub const LLMQ_400_85: LLMQParams =
    llmq(LLMQType::Llmqtype400_85, "llmq_400_85", 400, 350, 340, DKG_400_85, 4);
pub const LLMQ_100_67: LLMQParams =
    llmq(LLMQType::Llmqtype100_67, "llmq_100_67", 100, 80, 67, DKG_100_67, 24);
pub const LLMQ_60_75: LLMQParams = llmq(LLMQType::Llmqtype60_75, "llmq_60_75", 60, 50, 45, DKG_60_75, 32);
pub const LLMQ_25_67: LLMQParams = llmq(LLMQType::Llmqtype25_67, "llmq_25_67", 25, 22, 17, DKG_25_67, 24);
pub const LLMQ_TEST: LLMQParams = llmq(LLMQType::LlmqtypeTest, "llmq_test", 4, 2, 2, DKG_TEST, 2);
pub const LLMQ_DEVNET: LLMQParams = llmq(LLMQType::LlmqtypeDevnet, "llmq_devnet", 12, 7, 6, DKG_DEVNET, 4);
pub const LLMQ_V017: LLMQParams = llmq(LLMQType::LlmqtypeTestV17, "llmq_test_v17", 3, 2, 2, DKG_TEST, 2);
pub const LLMQ_TEST_DIP00024: LLMQParams =
    llmq(LLMQType::LlmqtypeTestDIP0024, "llmq_test_dip0024", 4, 3, 2, DKG_TEST, 2);
pub const LLMQ_TEST_INSTANT_SEND: LLMQParams =
    llmq(LLMQType::LlmqtypeTestInstantSend, "llmq_test_instantsend", 3, 2, 2, DKG_TEST, 2);
pub const LLMQ_0024: LLMQParams =
    llmq(LLMQType::LlmqtypeDevnetDIP0024, "llmq_devnet_dip0024", 8, 6, 4, DKG_DEVNET_DIP_0024, 2);
pub const LLMQ_TEST_PLATFORM: LLMQParams =
    llmq(LLMQType::LlmqtypeTestnetPlatform, "llmq_test_platform", 3, 2, 2, DKG_PLATFORM_TESTNET, 2);
pub const LLMQ_DEV_PLATFORM: LLMQParams =
    llmq(LLMQType::LlmqtypeDevnetPlatform, "llmq_dev_platform", 12, 9, 8, DKG_PLATFORM_DEVNET, 4);

/// A quorum type as it appears on the wire (one byte).
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Hash, Ord)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
#[repr(u8)]
pub enum LLMQType {
    Llmqtype50_60 = 1,   // 50 members,  30  (60%) threshold, 24 / day
    Llmqtype400_60 = 2,  // 400 members, 240 (60%) threshold, 2  / day
    Llmqtype400_85 = 3,  // 400 members, 340 (85%) threshold, 1  / day
    Llmqtype100_67 = 4,  // 100 members, 67  (67%) threshold, 24 / day
    Llmqtype60_75 = 5,   // 60 members,  45  (75%) threshold, rotating
    Llmqtype25_67 = 6,   // 25 members,  17  (67%) threshold, 24 / day

    LlmqtypeTest = 100,
    LlmqtypeDevnet = 101,
    LlmqtypeTestV17 = 102,
    LlmqtypeTestDIP0024 = 103,
    LlmqtypeTestInstantSend = 104,
    LlmqtypeDevnetDIP0024 = 105,
    LlmqtypeTestnetPlatform = 106,
    LlmqtypeDevnetPlatform = 107,
}

impl LLMQType {
    pub const ALL: [LLMQType; 14] = [
        LLMQType::Llmqtype50_60,
        LLMQType::Llmqtype400_60,
        LLMQType::Llmqtype400_85,
        LLMQType::Llmqtype100_67,
        LLMQType::Llmqtype60_75,
        LLMQType::Llmqtype25_67,
        LLMQType::LlmqtypeTest,
        LLMQType::LlmqtypeDevnet,
        LLMQType::LlmqtypeTestV17,
        LLMQType::LlmqtypeTestDIP0024,
        LLMQType::LlmqtypeTestInstantSend,
        LLMQType::LlmqtypeDevnetDIP0024,
        LLMQType::LlmqtypeTestnetPlatform,
        LLMQType::LlmqtypeDevnetPlatform,
    ];

    pub fn params(&self) -> LLMQParams {
        match self {
            LLMQType::Llmqtype50_60 => LLMQ_50_60,
            LLMQType::Llmqtype400_60 => LLMQ_400_60,
            LLMQType::Llmqtype400_85 => LLMQ_400_85,
            LLMQType::Llmqtype100_67 => LLMQ_100_67,
            LLMQType::Llmqtype60_75 => LLMQ_60_75,
            LLMQType::Llmqtype25_67 => LLMQ_25_67,
            LLMQType::LlmqtypeTest => LLMQ_TEST,
            LLMQType::LlmqtypeDevnet => LLMQ_DEVNET,
            LLMQType::LlmqtypeTestV17 => LLMQ_V017,
            LLMQType::LlmqtypeTestDIP0024 => LLMQ_TEST_DIP00024,
            LLMQType::LlmqtypeTestInstantSend => LLMQ_TEST_INSTANT_SEND,
            LLMQType::LlmqtypeDevnetDIP0024 => LLMQ_0024,
            LLMQType::LlmqtypeTestnetPlatform => LLMQ_TEST_PLATFORM,
            LLMQType::LlmqtypeDevnetPlatform => LLMQ_DEV_PLATFORM,
        }
    }

    pub fn size(&self) -> u32 {
        self.params().size
    }

    pub fn threshold(&self) -> u32 {
        self.params().threshold
    }

    pub fn active_quorum_count(&self) -> u32 {
        self.params().signing_active_quorum_count
    }

    pub fn index(&self) -> u8 {
        *self as u8
    }

    /// Quorums of these types are built from four quarters, one per DKG cycle.
    pub fn is_rotating_quorum_type(&self) -> bool {
        matches!(
            self,
            LLMQType::Llmqtype60_75 | LLMQType::LlmqtypeDevnetDIP0024 | LLMQType::LlmqtypeTestDIP0024
        )
    }

    /// Position of a quorum inside its DKG cycle. Only meaningful for rotating types.
    pub fn quorum_index_at(&self, height: CoreBlockHeight) -> u32 {
        height % self.params().dkg_params.interval
    }

    pub fn cycle_base_height(&self, height: CoreBlockHeight) -> CoreBlockHeight {
        height - self.quorum_index_at(height)
    }

    /// True for heights at which a non rotating quorum of this type may be formed.
    pub fn is_dkg_height(&self, height: CoreBlockHeight) -> bool {
        height % self.params().dkg_params.interval == 0
    }
}

impl Display for LLMQType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.index(), self.params().name)
    }
}

impl TryFrom<u8> for LLMQType {
    type Error = encode::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        LLMQType::ALL
            .into_iter()
            .find(|llmq_type| llmq_type.index() == value)
            .ok_or(encode::Error::InvalidEnumValue { name: "LLMQType", value: value as i64 })
    }
}

impl From<LLMQType> for u8 {
    fn from(value: LLMQType) -> Self {
        value.index()
    }
}

impl Encodable for LLMQType {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        self.index().consensus_encode(w)
    }
}

impl Decodable for LLMQType {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        LLMQType::try_from(u8::consensus_decode(r)?)
    }
}
