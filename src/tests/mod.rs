//! Scenario and command-line tests, compiled into the binary's test target.
