//! DDL for every table named in the data model.

use sqlx::SqlitePool;

use crate::error::StoreResult;

pub async fn migrate(pool: &SqlitePool) -> StoreResult<()> {
    sqlx::raw_sql(
        r#"
        CREATE TABLE IF NOT EXISTS render_profiles (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            name                TEXT NOT NULL UNIQUE,
            video_width         INTEGER NOT NULL,
            video_height        INTEGER NOT NULL,
            video_fps           REAL NOT NULL,
            video_codec         TEXT NOT NULL,
            audio_sample_rate   INTEGER NOT NULL,
            audio_channels      INTEGER NOT NULL,
            audio_codec         TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS channels (
            id                          INTEGER PRIMARY KEY AUTOINCREMENT,
            slug                        TEXT NOT NULL UNIQUE,
            display_name                TEXT NOT NULL,
            render_profile_id           INTEGER NOT NULL REFERENCES render_profiles(id),
            autopublish                 INTEGER NOT NULL DEFAULT 0,
            upload_target_channel_id    TEXT UNIQUE,
            created_at                  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS releases (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            channel_id          INTEGER NOT NULL REFERENCES channels(id),
            title               TEXT NOT NULL,
            description         TEXT NOT NULL DEFAULT '',
            tags                TEXT NOT NULL DEFAULT '',
            scheduled_at        TEXT,
            origin_meta_key     TEXT NOT NULL,
            created_at          TEXT NOT NULL,
            UNIQUE(channel_id, origin_meta_key)
        );

        CREATE TABLE IF NOT EXISTS assets (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            release_id      INTEGER NOT NULL REFERENCES releases(id),
            kind            TEXT NOT NULL,
            origin          TEXT NOT NULL,
            origin_id       TEXT,
            local_path      TEXT,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS jobs (
            id                      INTEGER PRIMARY KEY AUTOINCREMENT,
            release_id              INTEGER NOT NULL REFERENCES releases(id),
            job_type                TEXT NOT NULL,
            state                   TEXT NOT NULL,
            stage                   TEXT NOT NULL,
            priority                INTEGER NOT NULL DEFAULT 0,
            attempt                 INTEGER NOT NULL DEFAULT 0,
            locked_by               TEXT,
            locked_at               TEXT,
            retry_at                TEXT,
            progress_pct            REAL,
            progress_text           TEXT,
            error_reason            TEXT,
            approval_notified_at    TEXT,
            published_at            TEXT,
            delete_mp4_at           TEXT,
            created_at              TEXT NOT NULL,
            updated_at              TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_jobs_claim ON jobs(state, locked_by, retry_at, priority, created_at);

        CREATE TABLE IF NOT EXISTS job_input_links (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id      INTEGER NOT NULL REFERENCES jobs(id),
            asset_id    INTEGER NOT NULL REFERENCES assets(id),
            role        TEXT NOT NULL,
            "order"     INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS job_output_links (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id      INTEGER NOT NULL REFERENCES jobs(id),
            asset_id    INTEGER NOT NULL REFERENCES assets(id),
            role        TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS qa_reports (
            id                      INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id                  INTEGER NOT NULL UNIQUE REFERENCES jobs(id),
            hard_ok                 INTEGER NOT NULL,
            warnings                TEXT NOT NULL DEFAULT '[]',
            info                    TEXT NOT NULL DEFAULT '[]',
            probed_width            INTEGER,
            probed_height           INTEGER,
            probed_fps              REAL,
            probed_video_codec      TEXT,
            probed_audio_codec      TEXT,
            probed_sample_rate      INTEGER,
            probed_channels         INTEGER,
            expected_duration_sec   REAL,
            actual_duration_sec     REAL,
            mean_volume_db          REAL,
            max_volume_db           REAL,
            created_at              TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS upload_records (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id          INTEGER NOT NULL UNIQUE REFERENCES jobs(id),
            video_id        TEXT NOT NULL DEFAULT '',
            view_url        TEXT NOT NULL DEFAULT '',
            edit_url        TEXT NOT NULL DEFAULT '',
            privacy         TEXT NOT NULL DEFAULT 'private',
            uploaded_at     TEXT NOT NULL,
            error           TEXT
        );

        CREATE TABLE IF NOT EXISTS worker_heartbeats (
            worker_id       TEXT PRIMARY KEY,
            role            TEXT NOT NULL,
            pid             INTEGER NOT NULL,
            hostname        TEXT NOT NULL,
            last_seen_at    TEXT NOT NULL,
            detail          TEXT NOT NULL DEFAULT '{}'
        );

        CREATE TABLE IF NOT EXISTS job_drafts (
            job_id              INTEGER PRIMARY KEY REFERENCES jobs(id),
            background_name     TEXT NOT NULL,
            background_ext      TEXT NOT NULL,
            cover_name          TEXT,
            cover_ext           TEXT,
            audio_ids_text      TEXT NOT NULL,
            created_at          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS track_catalog (
            id                      INTEGER PRIMARY KEY AUTOINCREMENT,
            path                    TEXT NOT NULL UNIQUE,
            normalized_filename     TEXT NOT NULL,
            duration_sec            REAL,
            discovered_at           TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
