//! Gateway entities - objects carried inside dispatch payloads

mod channel;
mod guild;
mod member;
mod message;
mod stage_instance;
mod user;

pub use channel::{Channel, ChannelType};
pub use guild::{Guild, UnavailableGuild};
pub use member::Member;
pub use message::Message;
pub use stage_instance::{StageInstance, StagePrivacyLevel};
pub use user::User;
