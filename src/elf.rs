//! ELF section-table engine (spec.md §4.4/§6.4).
//!
//! Grounded on `Chris--B-riscv-asm`'s use of `goblin::elf::Elf::parse`
//! to read section headers out of a raw byte buffer from the example
//! pack. Unlike the hex engine, sections live at fixed, non-overlapping
//! file offsets, so `write_section` only has to bounds-check a size
//! match and copy bytes in place; no record bookkeeping is needed.

use std::error::Error;
use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElfError {
    Malformed(String),
    NoSuchSection(String),
    SizeMismatch { section: String, expected: usize, got: usize },
}

impl Display for ElfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElfError::Malformed(msg) => write!(f, "malformed ELF file: {msg}"),
            ElfError::NoSuchSection(name) => write!(f, "no such section: {name}"),
            ElfError::SizeMismatch { section, expected, got } => write!(
                f,
                "section {section} has size {expected}, got {got} bytes"
            ),
        }
    }
}

impl Error for ElfError {}

struct SectionInfo {
    name: String,
    address: u64,
    size: u64,
    file_offset: u64,
}

pub struct ElfFile {
    raw: Vec<u8>,
    sections: Vec<SectionInfo>,
    pub origin: Option<crate::hex::Origin>,
}

impl ElfFile {
    pub fn set_origin(&mut self, origin: crate::hex::Origin) {
        self.origin = Some(origin);
    }

    pub fn parse(raw: Vec<u8>) -> Result<ElfFile, ElfError> {
        let elf = goblin::elf::Elf::parse(&raw).map_err(|e| ElfError::Malformed(e.to_string()))?;

        let mut sections = Vec::new();
        for header in &elf.section_headers {
            let name = elf
                .shdr_strtab
                .get_at(header.sh_name)
                .unwrap_or("")
                .to_string();
            if name.is_empty() {
                continue;
            }
            sections.push(SectionInfo {
                name,
                address: header.sh_addr,
                size: header.sh_size,
                file_offset: header.sh_offset,
            });
        }

        Ok(ElfFile { raw, sections, origin: None })
    }

    fn find(&self, name: &str) -> Option<&SectionInfo> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn sections(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.name.clone()).collect()
    }

    pub fn section_address(&self, name: &str) -> Result<u64, ElfError> {
        self.find(name).map(|s| s.address).ok_or_else(|| ElfError::NoSuchSection(name.to_string()))
    }

    pub fn section_size(&self, name: &str) -> Result<u64, ElfError> {
        self.find(name).map(|s| s.size).ok_or_else(|| ElfError::NoSuchSection(name.to_string()))
    }

    pub fn read_section(&self, name: &str) -> Result<Vec<u8>, ElfError> {
        let section = self.find(name).ok_or_else(|| ElfError::NoSuchSection(name.to_string()))?;
        let start = section.file_offset as usize;
        let end = start + section.size as usize;
        Ok(self.raw[start..end].to_vec())
    }

    /// Overwrites `data` into a section starting at `offset` bytes
    /// into the section (spec.md §4.4, §6.4). Sections are fixed-size
    /// file-offset windows, so the write must fit within the section's
    /// existing bounds.
    pub fn write_section(&mut self, name: &str, data: &[u8], offset: u64) -> Result<(), ElfError> {
        let section = self.find(name).ok_or_else(|| ElfError::NoSuchSection(name.to_string()))?;
        let end = offset
            .checked_add(data.len() as u64)
            .filter(|&end| end <= section.size)
            .ok_or_else(|| ElfError::SizeMismatch {
                section: name.to_string(),
                expected: section.size as usize,
                got: (offset as usize) + data.len(),
            })?;
        let file_start = (section.file_offset + offset) as usize;
        let file_end = (section.file_offset + end) as usize;
        self.raw[file_start..file_end].copy_from_slice(data);
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_elf_bytes() {
        assert!(ElfFile::parse(vec![0u8; 16]).is_err());
    }
}
