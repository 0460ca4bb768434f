//! The chat agent that turns a rendered prompt into a reply.

mod reply;

pub use reply::ReplyGenerator;
