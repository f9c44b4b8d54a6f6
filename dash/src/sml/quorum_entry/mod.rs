mod hash;
mod helpers;
pub mod qualified_quorum_entry;
pub mod quorum_modifier_type;
pub(crate) mod validation;
mod verify_message;
