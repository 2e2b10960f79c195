// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the mapping store.

pub mod cursors;
pub mod mappings;
