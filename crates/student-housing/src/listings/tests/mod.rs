mod common;
mod counters;
mod moderation;
mod search;
