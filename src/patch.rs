use smallvec::SmallVec;
use thiserror::Error;

use crate::common::{EXTENSION_INTRODUCER, TRAILER};

/// A byte-level correction accepted during a parse.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Patch {
    pub index: usize,
    pub old_value: u8,
    pub new_value: u8,
}

/// Why a patch was not applied to a buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum StalePatch {
    #[error("patching requested at index {index:#x}, wanted {expected:#04x} got {found:#04x}")]
    Mismatch {
        index: usize,
        expected: u8,
        found: u8,
    },
    #[error("patching requested at index {index:#x}, past the end of a {len} byte buffer")]
    OutOfRange { index: usize, len: usize },
}

impl Patch {
    /// A trailer byte that was really an extension introducer.
    pub fn forged_trailer(index: usize) -> Self {
        Self {
            index,
            old_value: TRAILER,
            new_value: EXTENSION_INTRODUCER,
        }
    }

    /// Does `data` still hold the value this patch expects to replace?
    pub fn check(&self, data: &[u8]) -> Result<(), StalePatch> {
        match data.get(self.index) {
            Some(&found) if found == self.old_value => Ok(()),
            Some(&found) => Err(StalePatch::Mismatch {
                index: self.index,
                expected: self.old_value,
                found,
            }),
            None => Err(StalePatch::OutOfRange {
                index: self.index,
                len: data.len(),
            }),
        }
    }

    /// Write `new_value`, but only over the expected `old_value`.
    pub fn apply(&self, data: &mut [u8]) -> Result<(), StalePatch> {
        self.check(data)?;
        data[self.index] = self.new_value;
        Ok(())
    }
}

/// Patches in the order they were accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchLedger {
    patches: SmallVec<[Patch; 4]>,
}

impl PatchLedger {
    pub(crate) fn record(&mut self, patch: Patch) {
        self.patches.push(patch);
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn as_slice(&self) -> &[Patch] {
        &self.patches
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Patch> {
        self.patches.iter()
    }

    /// Apply every patch whose precondition still holds; returns the ones that were skipped.
    pub fn apply_to(&self, data: &mut [u8]) -> Vec<StalePatch> {
        self.patches
            .iter()
            .filter_map(|patch| patch.apply(data).err())
            .collect()
    }
}

impl<'a> IntoIterator for &'a PatchLedger {
    type Item = &'a Patch;
    type IntoIter = core::slice::Iter<'a, Patch>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_checks_old_value() {
        let patch = Patch::forged_trailer(2);
        let mut data = [0x00, 0x00, 0x3b, 0xf9];
        patch.apply(&mut data).unwrap();
        assert_eq!(data, [0x00, 0x00, 0x21, 0xf9]);

        assert_eq!(
            patch.apply(&mut data),
            Err(StalePatch::Mismatch {
                index: 2,
                expected: 0x3b,
                found: 0x21
            })
        );
        assert_eq!(data, [0x00, 0x00, 0x21, 0xf9]);
    }

    #[test]
    fn out_of_range_patch_is_skipped() {
        let patch = Patch::forged_trailer(10);
        assert_eq!(
            patch.check(&[0x3b]),
            Err(StalePatch::OutOfRange { index: 10, len: 1 })
        );
    }

    #[test]
    fn ledger_reports_skipped_patches() {
        let mut ledger = PatchLedger::default();
        ledger.record(Patch::forged_trailer(0));
        ledger.record(Patch::forged_trailer(1));
        ledger.record(Patch::forged_trailer(5));
        assert_eq!(ledger.len(), 3);

        let mut data = [0x3b, 0x2c, 0x3b];
        let skipped = ledger.apply_to(&mut data);
        assert_eq!(data, [0x21, 0x2c, 0x3b]);
        assert_eq!(skipped.len(), 2);
        assert!(skipped[0].to_string().contains("wanted 0x3b got 0x2c"));
        assert!(matches!(skipped[1], StalePatch::OutOfRange { index: 5, .. }));
    }
}
