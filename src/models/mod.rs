pub mod conversation;
pub mod driver_stats;
pub mod intent;
pub mod order;
pub mod reply;

pub use conversation::{
    Conversation, ConversationMessage, ConversationState, PendingClarification, Role, Slot,
};
pub use driver_stats::DriverStats;
pub use intent::{EntitySet, Intent, ItemEdit, Utterance};
pub use order::{generate_tracking_id, NewOrder, Order, OrderFilter, OrderStatus, OrderUpdate};
pub use reply::{Action, Reminder, ReplyEnvelope};
