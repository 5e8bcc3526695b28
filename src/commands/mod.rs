/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `chat`             — Interactive chat panel
- `oneshot`          — Single-shot ask/health/conversations/ingest commands
- `special_commands` — Slash-command parser for the interactive session

These handlers are intentionally small and use the library components:
the transport, the panel host, and the health monitor.
*/

pub mod chat;
pub mod oneshot;
pub mod special_commands;
