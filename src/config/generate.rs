pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# NEM12-IMPORT CONFIGURATION
# =============================================================================
# Settings for importing NEM12 interval meter data into DuckDB.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/nem12-import/config.yml
#   3. /etc/nem12-import/config.yml
#
# Every setting is optional. A value may refer to an environment variable by
# writing $env followed by the variable name in braces, and paths may start
# with ~.

# =============================================================================
# IMPORT
# =============================================================================

import:
  # IANA time zone the file's dates and times are written in
  timezone: Australia/Sydney

  # Record indicators that close a batch. With the default, every 200 record
  # ends the batch it appears in, so each batch holds the interval data of one
  # meter followed by the next meter's 200 line.
  dispatch_on: [200]

# =============================================================================
# STORAGE
# =============================================================================

storage:
  # DuckDB database file; created along with its directory if missing
  path: ~/.local/share/nem12-import/meter_data.duckdb

# =============================================================================
# REPORT
# =============================================================================

report:
  # Also write failed lines as JSON, one object per line. Failures are always
  # logged.
  failures_path: null
"#
    .to_string()
}
