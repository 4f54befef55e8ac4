// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Result of one step of a phase handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<S> {
    /// Enter `S` before the next step.
    Next(S),
    /// Keep the current state; the handler has more work.
    Stay,
    /// The transaction is over.
    Done,
}
