//! Config surface (§4.7, §6): a plain `RunConfig`/`Action` bitset the Driver
//! accepts as a parameter instead of reading from global/env state, so the
//! library half stays embeddable and testable independent of argv.

use std::path::PathBuf;

use bitflags::bitflags;

bitflags! {
    /// Mirrors §6's CLI surface contract. `Check`/`NoCheck`-style mutually
    /// exclusive pairs are resolved by the CLI before `Action` is built:
    /// the bitset itself only records the winner.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Action: u32 {
        const ENCODE               = 1 << 0;
        const DECODE                = 1 << 1;
        const CHECK                 = 1 << 2;
        const QUICK_CHECK           = 1 << 3;
        const INFO                  = 1 << 4;
        const CONCH                 = 1 << 5;
        const CHECK_PADDING         = 1 << 6;
        const QUICK_CHECK_PADDING   = 1 << 7;
        const COHERENCY             = 1 << 8;
        const HASH                  = 1 << 9;
        const FRAME_MD5             = 1 << 10;
        const ACCEPT_TRUNCATED      = 1 << 11;
        const DISPLAY_COMMAND       = 1 << 12;
        const ACCEPT_FILES          = 1 << 13;
    }
}

/// Honored by `FrameWriter` on an overwrite conflict (§4.5, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptPolicy {
    #[default]
    Ask,
    AlwaysYes,
    AlwaysNo,
}

/// Everything the Driver needs for one run, independent of how it was
/// gathered (CLI args in production, literal values in a test harness).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub action: Action,
    pub prompt_policy: PromptPolicy,
}

impl RunConfig {
    pub fn new(inputs: Vec<PathBuf>, output: PathBuf, action: Action) -> Self {
        Self {
            inputs,
            output,
            action,
            prompt_policy: PromptPolicy::default(),
        }
    }

    pub fn parse_options(&self) -> crate::parser::ParseOptions {
        crate::parser::ParseOptions {
            accept_truncated: self.action.contains(Action::ACCEPT_TRUNCATED),
            check_padding: self
                .action
                .intersects(Action::CHECK_PADDING | Action::QUICK_CHECK_PADDING),
        }
    }
}
