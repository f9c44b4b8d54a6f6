use hashes::Hash;

use crate::hash_types::{ConfirmedHashHashedWithProRegTx, Sha256dHash};
use crate::sml::masternode_list_entry::MasternodeListEntry;

impl MasternodeListEntry {
    /// The leaf of this entry in the masternode list merkle tree.
    pub fn calculate_entry_hash(&self) -> Sha256dHash {
        let mut writer = Vec::new();
        // writes into a Vec<u8> are infallible
        let _ = self.consensus_encode_for_hash(&mut writer);
        Sha256dHash::hash(&writer)
    }

    /// `sha256(proRegTxHash || confirmedHash)`, the per masternode part of its score.
    pub fn confirmed_hash_hashed_with_pro_reg_tx(&self) -> Option<ConfirmedHashHashedWithProRegTx> {
        self.confirmed_hash.map(|confirmed_hash| {
            let mut bytes = [0u8; 64];
            bytes[..32].copy_from_slice(self.pro_reg_tx_hash.as_byte_array());
            bytes[32..].copy_from_slice(confirmed_hash.as_byte_array());
            ConfirmedHashHashedWithProRegTx::hash(&bytes)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::sml::masternode_list_entry::tests::entry;

    #[test]
    fn entry_hash_tracks_every_field() {
        let original = entry(1);
        let mut changed = original.clone();
        changed.is_valid = false;
        assert_ne!(original.calculate_entry_hash(), changed.calculate_entry_hash());
        assert_eq!(original.calculate_entry_hash(), entry(1).calculate_entry_hash());
    }

    #[test]
    fn unconfirmed_entries_have_no_score_base() {
        let mut unconfirmed = entry(2);
        unconfirmed.confirmed_hash = None;
        assert!(unconfirmed.confirmed_hash_hashed_with_pro_reg_tx().is_none());
        assert!(entry(2).confirmed_hash_hashed_with_pro_reg_tx().is_some());
    }
}
