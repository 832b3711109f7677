//! CLI module for the identity store
//!
//! Every subcommand opens the configured store, runs one operation and
//! prints the result as JSON on stdout.

pub mod admin;

use clap::{Parser, Subcommand};

/// Identity store - users, role catalog and role assignments
#[derive(Parser)]
#[command(name = "identity-store")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Create the schema (postgres backend) and seed the role catalog
    Init,

    /// Insert any missing role rows
    SeedRoles,

    /// Register a user, hashing the given password
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Show a user by username
    ShowUser { username: String },

    /// List all users
    ListUsers,

    /// Delete a user and its role assignments
    DeleteUser { id: i64 },

    /// Look up a role by name (USER, MODERATOR, ADMIN)
    FindRole { name: String },

    /// Grant a role to a user
    Assign {
        #[arg(long)]
        user_id: i64,
        #[arg(long)]
        role: String,
    },

    /// Withdraw a role from a user
    Revoke {
        #[arg(long)]
        user_id: i64,
        #[arg(long)]
        role: String,
    },

    /// List the roles a user holds
    Roles { user_id: i64 },

    /// List the users holding a role
    Members { role: String },

    /// Check a username/password pair
    Verify {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}
