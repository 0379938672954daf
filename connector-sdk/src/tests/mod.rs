//! Mock-server tests for the connector SDK
//!
//! Each module drives one client against a WireMock server.
