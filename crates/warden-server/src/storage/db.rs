//! SQLite database for the Warden server.

warden_core::define_database!(AuthDatabase, "Auth database migrations complete");
