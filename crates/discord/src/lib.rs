//! Discord Integration - gateway bot interface
//!
//! This crate provides the Discord interface for hexbot:
//! - **Gateway Runner** (`runner`) - WebSocket event loop with reconnection logic
//! - **Commands** (`commands`) - the `/hex` and `/help` slash commands
//! - **Events** (`events`) - interaction decoding and dispatch
//! - **Messages** (`messages`) - embed and button response builders
//! - **Claims** (`claims`) - the color-role create/update workflow
//!
//! # Getting Started
//!
//! 1. Create an application at https://discord.com/developers/applications
//! 2. Add a bot user and invite it to your guild with the Manage Roles permission
//! 3. Set env vars: `HEXBOT_DISCORD_BOT_TOKEN` (or `DISCORD_TOKEN`),
//!    `HEXBOT_DISCORD_APPLICATION_ID`
//!
//! # Architecture
//!
//! ```text
//! Gateway Events → EventDispatcher → Handlers → Role Claims
//!                       ↓
//!       Interaction Responses ← Message Builders
//! ```
//!
//! # Key Types
//!
//! - `GatewayRunner` - gateway event loop with reconnection logic
//! - `EventDispatcher` - routes decoded events to their handlers
//! - `MessageBuilder` - constructs interaction response payloads
//! - `RoleClaimService` - trait behind the submit-to-role workflow

pub mod claims;
pub mod commands;
pub mod events;
pub mod messages;
pub mod runner;
