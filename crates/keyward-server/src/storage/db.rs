//! `SQLite` database for the Keyward license server.

keyward_core::define_database!(LicenseDatabase, "License database migrations complete");
