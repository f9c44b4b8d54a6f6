use crate::prelude::CoreBlockHeight;
use crate::sml::masternode_list::MasternodeList;
use crate::sml::masternode_list_engine::MasternodeListEngine;

impl MasternodeListEngine {
    /// The newest list at or below `core_block_height`.
    pub fn masternode_list_at_or_before(&self, core_block_height: CoreBlockHeight) -> Option<&MasternodeList> {
        self.masternode_lists.range(..=core_block_height).next_back().map(|(_, list)| list)
    }

    /// The closest lists at or below and strictly above `core_block_height`.
    pub fn masternode_lists_around_height(
        &self,
        core_block_height: CoreBlockHeight,
    ) -> (Option<&MasternodeList>, Option<&MasternodeList>) {
        let lower = self.masternode_list_at_or_before(core_block_height);
        let upper = core_block_height
            .checked_add(1)
            .and_then(|above| self.masternode_lists.range(above..).next().map(|(_, list)| list));
        (lower, upper)
    }
}
