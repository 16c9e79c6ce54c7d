use num_enum::TryFromPrimitive;

/// Marker codes of a JPEG 2000 Part 1 codestream (ISO/IEC 15444-1, Annex A).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u16)]
pub enum J2kMarker {
    /// SOC: Start of codestream.
    StartOfCodestream = 0xFF4F,

    /// CAP: Extended capabilities (Part 15).
    Capability = 0xFF50,

    /// SIZ: Image and tile size.
    ImageAndTileSize = 0xFF51,

    /// COD: Coding style default.
    CodingStyleDefault = 0xFF52,

    /// COC: Coding style component.
    CodingStyleComponent = 0xFF53,

    /// TLM: Tile-part lengths.
    TilePartLengths = 0xFF55,

    /// PLM: Packet length, main header.
    PacketLengthMain = 0xFF57,

    /// PLT: Packet length, tile-part header.
    PacketLengthTile = 0xFF58,

    /// QCD: Quantization default.
    QuantizationDefault = 0xFF5C,

    /// QCC: Quantization component.
    QuantizationComponent = 0xFF5D,

    /// RGN: Region of interest.
    RegionOfInterest = 0xFF5E,

    /// POC: Progression order change.
    ProgressionOrderChange = 0xFF5F,

    /// PPM: Packed packet headers, main header.
    PackedPacketHeadersMain = 0xFF60,

    /// PPT: Packed packet headers, tile-part header.
    PackedPacketHeadersTile = 0xFF61,

    /// CRG: Component registration.
    ComponentRegistration = 0xFF63,

    /// COM: Comment.
    Comment = 0xFF64,

    /// SOT: Start of tile-part.
    StartOfTile = 0xFF90,

    /// SOP: Start of packet.
    StartOfPacket = 0xFF91,

    /// EPH: End of packet header.
    EndOfPacketHeader = 0xFF92,

    /// SOD: Start of data.
    StartOfData = 0xFF93,

    /// EOC: End of codestream.
    EndOfCodestream = 0xFFD9,
}

impl J2kMarker {
    /// Whether a 16-bit segment length follows the marker code.
    ///
    /// SOC, EPH, SOD and EOC are bare markers.
    pub fn has_length(self) -> bool {
        !matches!(
            self,
            Self::StartOfCodestream
                | Self::EndOfPacketHeader
                | Self::StartOfData
                | Self::EndOfCodestream
        )
    }

    /// The short mnemonic used in Annex A.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::StartOfCodestream => "SOC",
            Self::Capability => "CAP",
            Self::ImageAndTileSize => "SIZ",
            Self::CodingStyleDefault => "COD",
            Self::CodingStyleComponent => "COC",
            Self::TilePartLengths => "TLM",
            Self::PacketLengthMain => "PLM",
            Self::PacketLengthTile => "PLT",
            Self::QuantizationDefault => "QCD",
            Self::QuantizationComponent => "QCC",
            Self::RegionOfInterest => "RGN",
            Self::ProgressionOrderChange => "POC",
            Self::PackedPacketHeadersMain => "PPM",
            Self::PackedPacketHeadersTile => "PPT",
            Self::ComponentRegistration => "CRG",
            Self::Comment => "COM",
            Self::StartOfTile => "SOT",
            Self::StartOfPacket => "SOP",
            Self::EndOfPacketHeader => "EPH",
            Self::StartOfData => "SOD",
            Self::EndOfCodestream => "EOC",
        }
    }
}

// The size in bytes of a marker code and of a segment length field.
pub const MARKER_SIZE: usize = 2;
pub const SEGMENT_LENGTH_SIZE: usize = 2;
