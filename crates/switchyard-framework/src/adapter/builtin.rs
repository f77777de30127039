//! Built-in adapters and mappers.

use switchyard_core::{OptionType, RawKind, RawValue};

use super::{AdaptContext, TypeAdapterRegistry};
use crate::argument::{Argument, Mentionable};

pub(super) fn register(registry: &mut TypeAdapterRegistry) {
    registry
        .register(RawKind::String, OptionType::String, string)
        .register(RawKind::String, OptionType::Integer, string_to_integer)
        .register(RawKind::String, OptionType::Number, string_to_number)
        .register(RawKind::String, OptionType::Boolean, string_to_boolean)
        .register(RawKind::Integer, OptionType::Integer, integer)
        .register(RawKind::Number, OptionType::Number, number)
        .register(RawKind::Number, OptionType::Integer, number_to_integer)
        .register(RawKind::Boolean, OptionType::Boolean, boolean)
        .register(RawKind::Attachment, OptionType::Attachment, attachment)
        .register(RawKind::User, OptionType::User, user)
        .register(RawKind::User, OptionType::Member, member)
        .register(RawKind::Channel, OptionType::Channel, channel)
        .register(RawKind::Role, OptionType::Role, role)
        .register(RawKind::Mentionable, OptionType::Mentionable, mentionable);

    registry
        .register_mapper(OptionType::Integer, OptionType::Number, integer_to_number)
        .register_mapper(OptionType::Member, OptionType::User, member_to_user)
        .register_mapper(OptionType::Mentionable, OptionType::User, mentionable_to_user)
        .register_mapper(OptionType::Mentionable, OptionType::Role, mentionable_to_role);
}

// ─── Primitives ───────────────────────────────────────────────────────────────

fn string(raw: &RawValue, _: &AdaptContext<'_>) -> Option<Argument> {
    match raw {
        RawValue::String(value) => Some(Argument::String(value.clone())),
        _ => None,
    }
}

fn string_to_integer(raw: &RawValue, _: &AdaptContext<'_>) -> Option<Argument> {
    match raw {
        RawValue::String(value) => value.trim().parse().ok().map(Argument::Integer),
        _ => None,
    }
}

fn string_to_number(raw: &RawValue, _: &AdaptContext<'_>) -> Option<Argument> {
    match raw {
        RawValue::String(value) => value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Argument::Number),
        _ => None,
    }
}

fn string_to_boolean(raw: &RawValue, _: &AdaptContext<'_>) -> Option<Argument> {
    match raw {
        RawValue::String(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Argument::Boolean(true)),
            "false" => Some(Argument::Boolean(false)),
            _ => None,
        },
        _ => None,
    }
}

fn integer(raw: &RawValue, _: &AdaptContext<'_>) -> Option<Argument> {
    match raw {
        RawValue::Integer(value) => Some(Argument::Integer(*value)),
        _ => None,
    }
}

fn number(raw: &RawValue, _: &AdaptContext<'_>) -> Option<Argument> {
    match raw {
        RawValue::Number(value) => Some(Argument::Number(*value)),
        _ => None,
    }
}

/// Only whole numbers inside the `i64` range.
fn number_to_integer(raw: &RawValue, _: &AdaptContext<'_>) -> Option<Argument> {
    match raw {
        RawValue::Number(value)
            if value.fract() == 0.0 && *value >= i64::MIN as f64 && *value < i64::MAX as f64 =>
        {
            Some(Argument::Integer(*value as i64))
        }
        _ => None,
    }
}

fn boolean(raw: &RawValue, _: &AdaptContext<'_>) -> Option<Argument> {
    match raw {
        RawValue::Boolean(value) => Some(Argument::Boolean(*value)),
        _ => None,
    }
}

fn attachment(raw: &RawValue, _: &AdaptContext<'_>) -> Option<Argument> {
    match raw {
        RawValue::Attachment(value) => Some(Argument::Attachment(value.clone())),
        _ => None,
    }
}

// ─── Entities ─────────────────────────────────────────────────────────────────

fn user(raw: &RawValue, ctx: &AdaptContext<'_>) -> Option<Argument> {
    let RawValue::User(id) = raw else {
        return None;
    };
    ctx.entities
        .user(*id)
        .or_else(|| (ctx.interaction.user.id == *id).then(|| ctx.interaction.user.clone()))
        .map(Argument::User)
}

fn member(raw: &RawValue, ctx: &AdaptContext<'_>) -> Option<Argument> {
    let RawValue::User(id) = raw else {
        return None;
    };
    let guild_id = ctx.interaction.guild_id?;
    ctx.entities
        .member(guild_id, *id)
        .or_else(|| {
            ctx.interaction
                .member
                .as_ref()
                .filter(|member| member.user.id == *id)
                .cloned()
        })
        .map(Argument::Member)
}

fn channel(raw: &RawValue, ctx: &AdaptContext<'_>) -> Option<Argument> {
    match raw {
        RawValue::Channel(id) => ctx.entities.channel(*id).map(Argument::Channel),
        _ => None,
    }
}

fn role(raw: &RawValue, ctx: &AdaptContext<'_>) -> Option<Argument> {
    let RawValue::Role(id) = raw else {
        return None;
    };
    let guild_id = ctx.interaction.guild_id?;
    ctx.entities.role(guild_id, *id).map(Argument::Role)
}

/// Members first, then users, then roles.
fn mentionable(raw: &RawValue, ctx: &AdaptContext<'_>) -> Option<Argument> {
    let RawValue::Mentionable(id) = raw else {
        return None;
    };
    let guild = ctx.interaction.guild_id;
    guild
        .and_then(|guild_id| ctx.entities.member(guild_id, *id))
        .map(Mentionable::Member)
        .or_else(|| ctx.entities.user(*id).map(Mentionable::User))
        .or_else(|| {
            guild
                .and_then(|guild_id| ctx.entities.role(guild_id, *id))
                .map(Mentionable::Role)
        })
        .map(Argument::Mentionable)
}

// ─── Mappers ──────────────────────────────────────────────────────────────────

fn integer_to_number(argument: Argument, _: &AdaptContext<'_>) -> Option<Argument> {
    match argument {
        Argument::Integer(value) => Some(Argument::Number(value as f64)),
        _ => None,
    }
}

fn member_to_user(argument: Argument, _: &AdaptContext<'_>) -> Option<Argument> {
    match argument {
        Argument::Member(member) => Some(Argument::User(member.user)),
        _ => None,
    }
}

fn mentionable_to_user(argument: Argument, _: &AdaptContext<'_>) -> Option<Argument> {
    match argument {
        Argument::Mentionable(Mentionable::User(user)) => Some(Argument::User(user)),
        Argument::Mentionable(Mentionable::Member(member)) => Some(Argument::User(member.user)),
        _ => None,
    }
}

fn mentionable_to_role(argument: Argument, _: &AdaptContext<'_>) -> Option<Argument> {
    match argument {
        Argument::Mentionable(Mentionable::Role(role)) => Some(Argument::Role(role)),
        _ => None,
    }
}
