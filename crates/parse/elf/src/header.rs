//! ELF identification block and file header parsing.
//!
//! Validates the identification bytes, fixes the address width, and reads
//! the fixed header fields for both ELF32 and ELF64 files.

use core::fmt;
use std::io::{Read, Seek, SeekFrom};

use crate::error::ElfError;
use crate::reader::Decoder;

/// ELF magic bytes: `\x7fELF`.
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Size of the identification block (`e_ident`).
pub const EI_NIDENT: usize = 16;

/// Index of the class byte in `e_ident`.
const EI_CLASS: usize = 4;

/// Index of the data-encoding byte in `e_ident`.
const EI_DATA: usize = 5;

/// ELF class: 32-bit.
pub const ELFCLASS32: u8 = 1;

/// ELF class: 64-bit.
pub const ELFCLASS64: u8 = 2;

/// ELF data encoding: little-endian.
pub const ELFDATA2LSB: u8 = 1;

/// ELF data encoding: big-endian.
pub const ELFDATA2MSB: u8 = 2;

/// The only recognized `e_version`.
pub const EV_CURRENT: u64 = 1;

/// ELF machine: Intel 80386.
pub const EM_386: u16 = 3;

/// ELF machine: ARM (32-bit).
pub const EM_ARM: u16 = 40;

/// ELF machine: x86-64.
pub const EM_X86_64: u16 = 62;

/// ELF machine: Qualcomm Hexagon DSP.
pub const EM_QDSP6: u16 = 164;

/// ELF machine: AArch64.
pub const EM_AARCH64: u16 = 183;

/// ELF machine: RISC-V.
pub const EM_RISCV: u16 = 243;

/// Address width of an ELF file, from `EI_CLASS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    /// `ELFCLASS32`: 4-byte addresses and offsets.
    Elf32,
    /// `ELFCLASS64`: 8-byte addresses and offsets.
    Elf64,
}

impl ElfClass {
    /// Size in bytes of an address or file offset.
    #[must_use]
    pub const fn addr_size(self) -> usize {
        match self {
            Self::Elf32 => 4,
            Self::Elf64 => 8,
        }
    }

    /// The raw `EI_CLASS` byte.
    #[must_use]
    pub const fn raw(self) -> u8 {
        match self {
            Self::Elf32 => ELFCLASS32,
            Self::Elf64 => ELFCLASS64,
        }
    }

    /// Smallest program header entry that holds every field we read.
    pub(crate) const fn phdr_size(self) -> u16 {
        match self {
            Self::Elf32 => 32,
            Self::Elf64 => 56,
        }
    }

    /// Smallest section header entry that holds every field we read.
    pub(crate) const fn shdr_size(self) -> u16 {
        match self {
            Self::Elf32 => 40,
            Self::Elf64 => 64,
        }
    }
}

impl fmt::Display for ElfClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elf32 => f.write_str("ELF32"),
            Self::Elf64 => f.write_str("ELF64"),
        }
    }
}

/// Target architectures accepted by the header parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Machine {
    /// `EM_386`.
    X86,
    /// `EM_ARM`.
    Arm,
    /// `EM_X86_64`.
    X86_64,
    /// `EM_QDSP6`.
    Hexagon,
    /// `EM_AARCH64`.
    AArch64,
    /// `EM_RISCV`.
    RiscV,
}

impl Machine {
    /// Maps a raw `e_machine` value onto the allow-list.
    #[must_use]
    pub const fn from_raw(machine: u16) -> Option<Self> {
        match machine {
            EM_386 => Some(Self::X86),
            EM_ARM => Some(Self::Arm),
            EM_X86_64 => Some(Self::X86_64),
            EM_QDSP6 => Some(Self::Hexagon),
            EM_AARCH64 => Some(Self::AArch64),
            EM_RISCV => Some(Self::RiscV),
            _ => None,
        }
    }

    /// The raw `e_machine` value.
    #[must_use]
    pub const fn raw(self) -> u16 {
        match self {
            Self::X86 => EM_386,
            Self::Arm => EM_ARM,
            Self::X86_64 => EM_X86_64,
            Self::Hexagon => EM_QDSP6,
            Self::AArch64 => EM_AARCH64,
            Self::RiscV => EM_RISCV,
        }
    }

    /// The only class this machine may appear with.
    #[must_use]
    pub const fn required_class(self) -> ElfClass {
        match self {
            Self::X86 | Self::Arm | Self::Hexagon => ElfClass::Elf32,
            Self::X86_64 | Self::AArch64 | Self::RiscV => ElfClass::Elf64,
        }
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X86 => "x86",
            Self::Arm => "ARM",
            Self::X86_64 => "x86_64",
            Self::Hexagon => "Hexagon",
            Self::AArch64 => "AArch64",
            Self::RiscV => "RISC-V",
        })
    }
}

/// Object file type from `e_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    /// `ET_NONE`.
    None,
    /// `ET_REL`: relocatable object.
    Relocatable,
    /// `ET_EXEC`: fixed-address executable.
    Executable,
    /// `ET_DYN`: shared object or PIE.
    SharedObject,
    /// `ET_CORE`: core dump.
    Core,
    /// Any other value, including OS- and processor-specific ranges.
    Other(u16),
}

impl ObjectType {
    /// Interprets a raw `e_type` value.
    #[must_use]
    pub const fn from_raw(e_type: u16) -> Self {
        match e_type {
            0 => Self::None,
            1 => Self::Relocatable,
            2 => Self::Executable,
            3 => Self::SharedObject,
            4 => Self::Core,
            other => Self::Other(other),
        }
    }

    /// The raw `e_type` value.
    #[must_use]
    pub const fn raw(self) -> u16 {
        match self {
            Self::None => 0,
            Self::Relocatable => 1,
            Self::Executable => 2,
            Self::SharedObject => 3,
            Self::Core => 4,
            Self::Other(other) => other,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("NONE"),
            Self::Relocatable => f.write_str("REL"),
            Self::Executable => f.write_str("EXEC"),
            Self::SharedObject => f.write_str("DYN"),
            Self::Core => f.write_str("CORE"),
            Self::Other(raw) => write!(f, "ET_??? ({raw})"),
        }
    }
}

/// Parsed ELF file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfHeader {
    /// Address width.
    pub class: ElfClass,
    /// Object file type.
    pub object_type: ObjectType,
    /// Target architecture.
    pub machine: Machine,
    /// Virtual address of the entry point.
    pub e_entry: u64,
    /// Offset of the program header table in the file.
    pub e_phoff: u64,
    /// Offset of the section header table in the file.
    pub e_shoff: u64,
    /// Processor-specific flags.
    pub e_flags: u32,
    /// Size of each program header entry.
    pub e_phentsize: u16,
    /// Number of program header entries.
    pub e_phnum: u16,
    /// Size of each section header entry.
    pub e_shentsize: u16,
    /// Number of section header entries.
    pub e_shnum: u16,
    /// Section header string table index.
    pub e_shstrndx: u16,
}

impl ElfHeader {
    /// Validates the identification block of `source` and reads the header.
    ///
    /// On success, returns the header together with a decoder positioned
    /// just past it. On failure `source` is dropped.
    ///
    /// # Errors
    ///
    /// Returns the [`ElfError`] of the first validation step that fails,
    /// in the order the fields appear in the file.
    #[expect(clippy::similar_names, reason = "field names follow the ELF structures")]
    pub(crate) fn read<R: Read + Seek>(mut source: R) -> Result<(Self, Decoder<R>), ElfError> {
        let len = source.seek(SeekFrom::End(0))?;
        if len < EI_NIDENT as u64 {
            return Err(ElfError::TooSmall { len });
        }
        source.seek(SeekFrom::Start(0))?;
        let mut ident = [0u8; EI_NIDENT];
        source.read_exact(&mut ident)?;
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("e_ident = {}", hex_bytes(&ident));
        }

        if ident[..4] != ELF_MAGIC {
            return Err(ElfError::BadMagic);
        }

        let class = match ident[EI_CLASS] {
            ELFCLASS32 => ElfClass::Elf32,
            ELFCLASS64 => ElfClass::Elf64,
            other => return Err(ElfError::InvalidClass(other)),
        };

        match ident[EI_DATA] {
            ELFDATA2LSB => {}
            ELFDATA2MSB => return Err(ElfError::BigEndian),
            other => return Err(ElfError::InvalidEncoding(other)),
        }

        let mut decoder = Decoder::new(source, class);
        let object_type = ObjectType::from_raw(decoder.read_half()?);

        let raw_machine = decoder.read_half()?;
        let machine =
            Machine::from_raw(raw_machine).ok_or(ElfError::UnsupportedMachine(raw_machine))?;
        if machine.required_class() != class {
            return Err(ElfError::MachineClassMismatch {
                machine: raw_machine,
                class: class.raw(),
            });
        }

        let e_version = u64::from(decoder.read_word()?);
        if e_version != EV_CURRENT {
            return Err(ElfError::InvalidVersion(e_version));
        }

        let e_entry = decoder.read_addr()?;
        let e_phoff = decoder.read_off()?;
        let e_shoff = decoder.read_off()?;
        let e_flags = decoder.read_word()?;
        let _e_ehsize = decoder.read_half()?;
        let e_phentsize = decoder.read_half()?;
        let e_phnum = decoder.read_half()?;
        let e_shentsize = decoder.read_half()?;
        let e_shnum = decoder.read_half()?;
        let e_shstrndx = decoder.read_half()?;

        if e_phnum > 0 && e_phentsize < class.phdr_size() {
            return Err(ElfError::InvalidEntrySize {
                table: "program header",
                size: e_phentsize,
            });
        }
        if e_shnum > 0 && e_shentsize < class.shdr_size() {
            return Err(ElfError::InvalidEntrySize {
                table: "section header",
                size: e_shentsize,
            });
        }

        log::debug!(
            "{class} {machine} {object_type}: entry={e_entry:#x} phoff={e_phoff:#x} \
             phnum={e_phnum} shoff={e_shoff:#x} shnum={e_shnum} shstrndx={e_shstrndx}"
        );

        let header = Self {
            class,
            object_type,
            machine,
            e_entry,
            e_phoff,
            e_shoff,
            e_flags,
            e_phentsize,
            e_phnum,
            e_shentsize,
            e_shnum,
            e_shstrndx,
        };
        Ok((header, decoder))
    }
}

/// Formats bytes as space-separated lowercase hex pairs.
fn hex_bytes(bytes: &[u8]) -> String {
    use fmt::Write as _;

    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{b:02x}");
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    /// Field offsets within the file header and entry sizes for one class.
    #[derive(Clone, Copy)]
    pub(crate) struct Layout {
        pub class: ElfClass,
        pub ehdr_size: usize,
        phoff: usize,
        shoff: usize,
        phentsize: usize,
        phnum: usize,
        shentsize: usize,
        shnum: usize,
        shstrndx: usize,
    }

    pub(crate) const LAYOUT32: Layout = Layout {
        class: ElfClass::Elf32,
        ehdr_size: 52,
        phoff: 28,
        shoff: 32,
        phentsize: 42,
        phnum: 44,
        shentsize: 46,
        shnum: 48,
        shstrndx: 50,
    };

    pub(crate) const LAYOUT64: Layout = Layout {
        class: ElfClass::Elf64,
        ehdr_size: 64,
        phoff: 32,
        shoff: 40,
        phentsize: 54,
        phnum: 56,
        shentsize: 58,
        shnum: 60,
        shstrndx: 62,
    };

    pub(crate) fn put_u16(buf: &mut [u8], off: usize, v: u16) {
        buf[off..off + 2].copy_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn put_u32(buf: &mut [u8], off: usize, v: u32) {
        buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
    }

    /// Writes an address-sized value for `class`.
    #[expect(clippy::cast_possible_truncation, reason = "test values fit")]
    pub(crate) fn put_addr(buf: &mut [u8], class: ElfClass, off: usize, v: u64) {
        match class {
            ElfClass::Elf32 => put_u32(buf, off, v as u32),
            ElfClass::Elf64 => buf[off..off + 8].copy_from_slice(&v.to_le_bytes()),
        }
    }

    fn get_u16(buf: &[u8], off: usize) -> u16 {
        u16::from_le_bytes([buf[off], buf[off + 1]])
    }

    impl Layout {
        pub(crate) fn for_class(class: ElfClass) -> Self {
            match class {
                ElfClass::Elf32 => LAYOUT32,
                ElfClass::Elf64 => LAYOUT64,
            }
        }

        pub(crate) fn set_phoff(&self, buf: &mut [u8], off: u64) {
            put_addr(buf, self.class, self.phoff, off);
        }

        pub(crate) fn set_shoff(&self, buf: &mut [u8], off: u64) {
            put_addr(buf, self.class, self.shoff, off);
        }

        pub(crate) fn set_shstrndx(&self, buf: &mut [u8], index: u16) {
            put_u16(buf, self.shstrndx, index);
        }

        pub(crate) fn bump_phnum(&self, buf: &mut [u8]) {
            let n = get_u16(buf, self.phnum) + 1;
            put_u16(buf, self.phnum, n);
        }

        pub(crate) fn bump_shnum(&self, buf: &mut [u8]) {
            let n = get_u16(buf, self.shnum) + 1;
            put_u16(buf, self.shnum, n);
        }
    }

    /// Build a minimal valid header for `machine`, with no program or
    /// section headers. Entry sizes are set to the class minimums.
    pub(crate) fn make_elf_header(layout: Layout, machine: u16) -> Vec<u8> {
        let mut buf = vec![0u8; layout.ehdr_size];
        buf[0..4].copy_from_slice(&ELF_MAGIC);
        buf[EI_CLASS] = layout.class.raw();
        buf[EI_DATA] = ELFDATA2LSB;
        buf[6] = 1;
        // e_type: ET_DYN
        put_u16(&mut buf, 16, 3);
        put_u16(&mut buf, 18, machine);
        put_u32(&mut buf, 20, 1);
        // e_entry
        put_addr(&mut buf, layout.class, 24, 0x1000);
        layout.set_phoff(&mut buf, layout.ehdr_size as u64);
        put_u16(&mut buf, layout.phentsize, layout.class.phdr_size());
        put_u16(&mut buf, layout.shentsize, layout.class.shdr_size());
        buf
    }

    pub(crate) fn make_header64() -> Vec<u8> {
        make_elf_header(LAYOUT64, EM_X86_64)
    }

    pub(crate) fn make_header32() -> Vec<u8> {
        make_elf_header(LAYOUT32, EM_386)
    }

    fn parse(buf: &[u8]) -> Result<ElfHeader, ElfError> {
        ElfHeader::read(Cursor::new(buf.to_vec())).map(|(hdr, _)| hdr)
    }

    #[test]
    fn parse_valid_header64() {
        let buf = make_header64();
        let hdr = parse(&buf).expect("valid header");
        assert_eq!(hdr.class, ElfClass::Elf64);
        assert_eq!(hdr.machine, Machine::X86_64);
        assert_eq!(hdr.object_type, ObjectType::SharedObject);
        assert_eq!(hdr.e_entry, 0x1000);
        assert_eq!(hdr.e_phoff, 64);
        assert_eq!(hdr.e_phnum, 0);
        assert_eq!(hdr.e_phentsize, 56);
        assert_eq!(hdr.e_shentsize, 64);
    }

    #[test]
    fn parse_valid_header32() {
        let buf = make_header32();
        let hdr = parse(&buf).expect("valid header");
        assert_eq!(hdr.class, ElfClass::Elf32);
        assert_eq!(hdr.machine, Machine::X86);
        assert_eq!(hdr.e_entry, 0x1000);
        assert_eq!(hdr.e_phoff, 52);
        assert_eq!(hdr.e_phentsize, 32);
        assert_eq!(hdr.e_shentsize, 40);
    }

    #[test]
    fn decoder_is_left_after_header() {
        let buf = make_header32();
        let (_, mut decoder) = ElfHeader::read(Cursor::new(buf)).unwrap();
        assert_eq!(decoder.position().unwrap(), 52);
        assert_eq!(decoder.class(), ElfClass::Elf32);
    }

    #[test]
    fn object_type_is_not_restricted() {
        for raw in [0u16, 1, 2, 3, 4, 0xfe00] {
            let mut buf = make_header64();
            put_u16(&mut buf, 16, raw);
            let hdr = parse(&buf).expect("any e_type is accepted");
            assert_eq!(hdr.object_type.raw(), raw);
        }
        assert_eq!(ObjectType::from_raw(1), ObjectType::Relocatable);
        assert_eq!(ObjectType::from_raw(9), ObjectType::Other(9));
    }

    #[test]
    fn reject_short_sources() {
        for len in 0..EI_NIDENT {
            let buf = &make_header64()[..len];
            assert!(matches!(parse(buf), Err(ElfError::TooSmall { .. })));
        }
    }

    #[test]
    fn reject_ident_only_as_truncated() {
        let buf = &make_header64()[..EI_NIDENT];
        assert!(matches!(parse(buf), Err(ElfError::Io(_))));
    }

    #[test]
    fn reject_bad_magic() {
        for i in 0..4 {
            let mut buf = make_header64();
            buf[i] ^= 0x20;
            assert!(matches!(parse(&buf), Err(ElfError::BadMagic)));
        }
    }

    #[test]
    fn reject_invalid_class() {
        for class in [0u8, 3, 0xff] {
            let mut buf = make_header64();
            buf[EI_CLASS] = class;
            assert!(matches!(parse(&buf), Err(ElfError::InvalidClass(c)) if c == class));
        }
    }

    #[test]
    fn reject_big_endian_as_unsupported() {
        let mut buf = make_header64();
        buf[EI_DATA] = ELFDATA2MSB;
        assert!(matches!(parse(&buf), Err(ElfError::BigEndian)));
    }

    #[test]
    fn reject_invalid_encoding() {
        let mut buf = make_header64();
        buf[EI_DATA] = 0;
        assert!(matches!(parse(&buf), Err(ElfError::InvalidEncoding(0))));
    }

    #[test]
    fn reject_unknown_machine() {
        let mut buf = make_header64();
        put_u16(&mut buf, 18, 8); // EM_MIPS
        assert!(matches!(parse(&buf), Err(ElfError::UnsupportedMachine(8))));
    }

    #[test]
    fn machine_class_pairing() {
        let all = [EM_386, EM_ARM, EM_X86_64, EM_QDSP6, EM_AARCH64, EM_RISCV];
        for machine in all {
            let expected = Machine::from_raw(machine).unwrap().required_class();
            for layout in [LAYOUT32, LAYOUT64] {
                let buf = make_elf_header(layout, machine);
                let result = parse(&buf);
                if layout.class == expected {
                    assert!(result.is_ok(), "machine {machine} with {}", layout.class);
                } else {
                    assert!(
                        matches!(
                            result,
                            Err(ElfError::MachineClassMismatch { machine: m, class: c })
                                if m == machine && c == layout.class.raw()
                        ),
                        "machine {machine} with {}",
                        layout.class
                    );
                }
            }
        }
    }

    #[test]
    fn aarch64_with_32bit_class_cites_pairing() {
        let mut buf = make_header32();
        put_u16(&mut buf, 18, EM_AARCH64);
        let err = parse(&buf).unwrap_err();
        assert_eq!(err.to_string(), "invalid e_machine/EI_CLASS combination: 183/1");
    }

    #[test]
    fn reject_invalid_version() {
        let mut buf = make_header64();
        put_u32(&mut buf, 20, 2);
        assert!(matches!(parse(&buf), Err(ElfError::InvalidVersion(2))));
    }

    #[test]
    fn reject_small_entry_sizes() {
        let mut buf = make_header64();
        put_u16(&mut buf, LAYOUT64.phnum, 1);
        put_u16(&mut buf, LAYOUT64.phentsize, 32);
        assert!(matches!(
            parse(&buf),
            Err(ElfError::InvalidEntrySize { table: "program header", size: 32 })
        ));

        let mut buf = make_header32();
        put_u16(&mut buf, LAYOUT32.shnum, 1);
        put_u16(&mut buf, LAYOUT32.shentsize, 20);
        assert!(matches!(
            parse(&buf),
            Err(ElfError::InvalidEntrySize { table: "section header", size: 20 })
        ));
    }

    #[test]
    fn entry_sizes_ignored_without_entries() {
        let mut buf = make_header64();
        put_u16(&mut buf, LAYOUT64.phentsize, 0);
        put_u16(&mut buf, LAYOUT64.shentsize, 0);
        assert!(parse(&buf).is_ok());
    }

    #[test]
    fn hex_dump_format() {
        assert_eq!(hex_bytes(&[0x7f, b'E', 0]), "7f 45 00");
        assert_eq!(hex_bytes(&[]), "");
    }

    #[test]
    fn machine_round_trips_raw_value() {
        assert_eq!(Machine::from_raw(EM_QDSP6), Some(Machine::Hexagon));
        assert_eq!(Machine::Hexagon.raw(), EM_QDSP6);
        assert_eq!(Machine::from_raw(0), None);
    }
}
