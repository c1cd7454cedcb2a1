//! Numpad notation compiler.
//!
//! Turns free text such as `236HP` or `2mk + 6` into the sequence of
//! controller icons it names. Built on `winnow`: every position tries the
//! longest vocabulary entry first (case-insensitive) and anything unknown is
//! skipped one character at a time, so compilation never fails.

use crate::model::ControllerType;
use winnow::ascii::Caseless;
use winnow::combinator::alt;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::stream::Stream;
use winnow::token::{any, literal};

const ICON_DIR: &str = "/src/lib/images/controller";

/// One vocabulary entry: the token text and the icon it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Command {
    token: &'static str,
    icon: &'static str,
    /// `None` when the token belongs to every controller.
    controller: Option<ControllerType>,
}

const fn common(token: &'static str, icon: &'static str) -> Command {
    Command { token, icon, controller: None }
}

const fn classic(token: &'static str, icon: &'static str) -> Command {
    Command { token, icon, controller: Some(ControllerType::Classic) }
}

const fn modern(token: &'static str, icon: &'static str) -> Command {
    Command { token, icon, controller: Some(ControllerType::Modern) }
}

// Longest tokens first; matching walks this table in order.
const VOCABULARY: &[Command] = &[
    common("throw", "throw"),
    common("or", "or"),
    classic("lk", "light_kick"),
    classic("mk", "medium_kick"),
    classic("hk", "heavy_kick"),
    classic("lp", "light_punch"),
    classic("mp", "medium_punch"),
    classic("hp", "heavy_punch"),
    modern("sp", "sp"),
    modern("a_", "modern_auto"),
    common("1", "down_left"),
    common("2", "down"),
    common("3", "down_right"),
    common("4", "left"),
    common("5", "nutral"),
    common("6", "right"),
    common("7", "up_left"),
    common("8", "up"),
    common("9", "up_right"),
    common("+", "plus"),
    classic("k", "kick"),
    classic("p", "punch"),
    modern("l", "modern_l"),
    modern("m", "modern_m"),
    modern("h", "modern_h"),
];

/// A recognised input token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumpadToken {
    /// Lower-cased token text, e.g. `"lk"`.
    pub text: String,
    icon: &'static str,
}

impl NumpadToken {
    /// Icon file name without directory, e.g. `"light_kick.png"`.
    pub fn icon_name(&self) -> String {
        format!("{}.png", self.icon)
    }

    /// Asset path of the icon image.
    pub fn icon_path(&self) -> String {
        format!("{ICON_DIR}/{}.png", self.icon)
    }
}

/// Compile `input` into the icon tokens it names for `controller`.
pub fn compile(input: &str, controller: ControllerType) -> Vec<NumpadToken> {
    let mut rest = input;
    let mut tokens = Vec::new();
    while !rest.is_empty() {
        let step: ModalResult<Option<&'static Command>> = alt((
            command(controller).map(Some),
            any.map(|c: char| {
                log::trace!("numpad: skipping {c:?}");
                None
            }),
        ))
        .parse_next(&mut rest);
        match step {
            Ok(Some(cmd)) => tokens.push(NumpadToken {
                text: cmd.token.to_owned(),
                icon: cmd.icon,
            }),
            Ok(None) => {}
            Err(_) => break,
        }
    }
    tokens
}

/// Number of icons `input` compiles to; drives the block width.
pub fn token_count(input: &str, controller: ControllerType) -> usize {
    compile(input, controller).len()
}

fn command<'i>(
    controller: ControllerType,
) -> impl FnMut(&mut &'i str) -> ModalResult<&'static Command> {
    move |input: &mut &'i str| {
        for cmd in VOCABULARY
            .iter()
            .filter(|c| c.controller.is_none_or(|ct| ct == controller))
        {
            let start = input.checkpoint();
            if literal::<_, _, ContextError>(Caseless(cmd.token))
                .parse_next(input)
                .is_ok()
            {
                return Ok(cmd);
            }
            input.reset(&start);
        }
        Err(ErrMode::Backtrack(ContextError::new()))
    }
}
