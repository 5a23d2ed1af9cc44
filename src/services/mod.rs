pub mod ai;
pub mod conversation;
pub mod intents;
pub mod nlu;
pub mod orders;
pub mod sessions;
