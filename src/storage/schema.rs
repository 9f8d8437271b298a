/// Message raised by the insert trigger. Used to recognise ordering violations.
pub const ORDERING_VIOLATION_MESSAGE: &str = "started must be latest";

// `current` is either 1 or NULL, so the UNIQUE constraint allows any amount of closed entries but
// only a single open one.
pub const CREATE_LOG: &str = "
CREATE TABLE IF NOT EXISTS log(
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    started INTEGER UNIQUE NOT NULL,
    duration INTEGER NOT NULL DEFAULT 0,
    current INTEGER UNIQUE DEFAULT 1 CHECK (current IN (1))
);

CREATE TRIGGER IF NOT EXISTS on_insert_started INSERT ON log
FOR EACH ROW
BEGIN
    SELECT RAISE(ABORT, 'started must be latest')
    WHERE NEW.started < (SELECT MAX(started + duration) FROM log);
END;
";

/// Read-only projections for the database console. Recreated on every open so that changes to
/// them don't need migrations.
pub const CREATE_VIEWS: &str = "
DROP VIEW IF EXISTS latest;
CREATE VIEW latest AS
SELECT *
FROM log
ORDER BY started DESC
LIMIT 1;

DROP VIEW IF EXISTS log_pretty;
CREATE VIEW log_pretty AS
SELECT
    id,
    name,
    date(started, 'unixepoch', 'localtime') started_date,
    time(started, 'unixepoch', 'localtime') started_time,
    duration,
    time(duration, 'unixepoch') duration_pretty,
    current,
    datetime(started + duration, 'unixepoch', 'localtime') updated
FROM log;

DROP VIEW IF EXISTS log_daily;
CREATE VIEW log_daily AS
SELECT
    started_date as date,
    name,
    time(SUM(duration), 'unixepoch') duration_pretty,
    SUM(duration) duration
FROM log_pretty
GROUP BY started_date, name;
";

pub const SELECT_COLUMNS: &str = "SELECT id, name, started, duration, current FROM log";
