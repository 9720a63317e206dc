/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `login`   — Phone/OTP login and first-time registration
- `chat`    — Interactive consultation with the astrologer
- `history` — Past sessions listing
- `wallet`  — Balance, ledger, and recharge
- `admin`   — Administrative operations

These handlers are intentionally thin over the library components: the
session store, the gateway, and the chat controller.
*/

pub mod admin;
pub mod chat;
pub mod history;
pub mod login;
pub mod wallet;
