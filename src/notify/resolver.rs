//! # Channel Resolver
//!
//! Pure filter over a room's channel set: given event metadata, which of
//! the room's channels should receive the notification.

use super::event::{NotificationContext, Scope, UserDirection, WriteState};
use crate::registry::{Room, ScopeFilter, StateFilter, UsersFilter};
use crate::types::ChannelId;

/// Channels of a room that should receive an event with this context.
///
/// A channel is included iff its scope filter admits the event scope, its
/// state filter admits the write state, and, for user events, its users
/// filter admits the direction.
pub fn resolve_channels(room: &Room, ctx: &NotificationContext) -> Vec<ChannelId> {
    room.channels
        .iter()
        .filter(|(_, channel)| {
            scope_admits(channel.options.scope, ctx.scope)
                && state_admits(channel.options.state, ctx.state)
                && users_admit(channel.options.users, ctx.user)
        })
        .map(|(id, _)| id.clone())
        .collect()
}

fn scope_admits(filter: ScopeFilter, scope: Scope) -> bool {
    match filter {
        ScopeFilter::All => true,
        ScopeFilter::In => scope == Scope::In,
        ScopeFilter::Out => scope == Scope::Out,
        ScopeFilter::None => false,
    }
}

fn state_admits(filter: StateFilter, state: WriteState) -> bool {
    match filter {
        StateFilter::All => true,
        StateFilter::Pending => state == WriteState::Pending,
        StateFilter::Done => state == WriteState::Done,
    }
}

fn users_admit(filter: UsersFilter, user: Option<UserDirection>) -> bool {
    let Some(direction) = user else {
        // Not a user event, the users filter does not apply
        return true;
    };
    match filter {
        UsersFilter::All => true,
        UsersFilter::In => direction == UserDirection::In,
        UsersFilter::Out => direction == UserDirection::Out,
        UsersFilter::None => false,
    }
}
