use std::collections::HashMap;

use chrono::TimeDelta;
use futures::future::join_all;
use slotbook_domain::{
    BusyBlock,
    BusySource,
    EventType,
    Host,
    ID,
    MergedBusy,
    TimeSpan,
    Tz,
    timezone,
};
use slotbook_infra::{FreeBusyProviderQuery, SlotbookContext, metrics};
use tracing::warn;

/// The busy view one availability computation works against: external
/// calendars and the local ledger, merged, taken after the effective window
/// was computed. Never shared across requests.
#[derive(Debug)]
pub(crate) struct BusySnapshot {
    pub busy: MergedBusy,
    /// Accounts whose fetch failed or timed out; their busy blocks are
    /// missing from the snapshot (fail-open)
    pub failed_accounts: Vec<ID>,
}

/// Fetch busy blocks for every selected participating calendar plus the
/// booking ledger, in parallel, with per-account failure isolation.
pub(crate) async fn fetch_busy_snapshot(
    event_type: &EventType,
    host: &Host,
    window: &TimeSpan,
    ctx: &SlotbookContext,
) -> anyhow::Result<BusySnapshot> {
    let calendars = ctx
        .repos
        .calendars
        .find_multiple(event_type.participating_calendars.iter().collect())
        .await?;

    // Non-selected calendars are ignored entirely
    let mut external_ids_by_account: HashMap<ID, Vec<String>> = HashMap::new();
    for calendar in calendars.into_iter().filter(|c| c.selected_for_busy) {
        external_ids_by_account
            .entry(calendar.account_id)
            .or_default()
            .push(calendar.external_id);
    }

    let accounts = ctx.repos.accounts.find_by_host(&host.id).await?;

    // One fetch per account covering all of its calendars; invalid or
    // underscoped accounts are excluded
    let fetches = accounts
        .iter()
        .filter(|account| account.usable_for_busy())
        .filter_map(|account| {
            external_ids_by_account
                .get(&account.id)
                .map(|calendar_ids| (account, calendar_ids.clone()))
        })
        .map(|(account, calendar_ids)| {
            let query = FreeBusyProviderQuery {
                calendar_ids,
                time_min: window.start(),
                time_max: window.end(),
                include_tentative: event_type.include_tentative_busy,
            };
            async move {
                let res = tokio::time::timeout(
                    ctx.config.busy_fetch_timeout,
                    ctx.calendar_gateway.freebusy(account, query),
                )
                .await;
                match res {
                    Ok(Ok(blocks)) => (account, Ok(blocks)),
                    Ok(Err(e)) => (account, Err(e)),
                    Err(_) => (account, Err(anyhow::anyhow!("busy fetch deadline exceeded"))),
                }
            }
        });

    let mut blocks: Vec<BusyBlock> = Vec::new();
    let mut failed_accounts = Vec::new();
    for (account, result) in join_all(fetches).await {
        match result {
            Ok(account_blocks) => {
                blocks.extend(expand_all_day_blocks(account_blocks, &host.timezone));
            }
            Err(e) => {
                // Fail open: the account contributes nothing this round and
                // the pre-commit check plus the uniqueness gate still hold
                warn!(
                    "Busy fetch failed for account {}, treating it as free: {:?}",
                    account.id, e
                );
                metrics::BUSY_FETCH_FAILURES.inc();
                failed_accounts.push(account.id.clone());

                let mut account = account.clone();
                account.failed_busy_fetches += 1;
                if let Err(save_err) = ctx.repos.accounts.save(&account).await {
                    warn!(
                        "Unable to bump failure counter for account {}: {:?}",
                        account.id, save_err
                    );
                }
            }
        }
    }

    // The ledger is part of composite availability: PENDING and CONFIRMED
    // bookings block their slot
    let ledger = ctx
        .repos
        .bookings
        .find_blocking_in_timespan(&host.id, window.start(), window.end())
        .await?;
    blocks.extend(ledger.into_iter().map(|booking| {
        BusyBlock::new(booking.start_time, booking.end_time, BusySource::Booking)
    }));

    Ok(BusySnapshot {
        busy: MergedBusy::new(blocks),
        failed_accounts,
    })
}

/// Blocks covering a full day or more are treated as all-day events busy
/// over whole local days in the host timezone, `[midnight, nextMidnight)`.
pub(crate) fn expand_all_day_blocks(blocks: Vec<BusyBlock>, tz: &Tz) -> Vec<BusyBlock> {
    blocks
        .into_iter()
        .map(|block| {
            if block.end_time - block.start_time < TimeDelta::hours(24) {
                return block;
            }

            let start_date = timezone::to_local_wall(block.start_time, tz).date();
            let (start, _) = timezone::local_day_bounds(start_date, tz);

            let end_wall = timezone::to_local_wall(block.end_time, tz);
            let end = if end_wall.time() == chrono::NaiveTime::MIN {
                block.end_time
            } else {
                timezone::local_day_bounds(end_wall.date(), tz).1
            };

            BusyBlock::new(start, end, block.source)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use chrono::DateTime;

    use super::*;

    fn utc(s: &str) -> DateTime<chrono::Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().to_utc()
    }

    #[test]
    fn short_blocks_are_untouched() {
        let blocks = vec![BusyBlock::new(
            utc("2024-01-15T15:00:00Z"),
            utc("2024-01-15T16:00:00Z"),
            BusySource::Calendar("primary".into()),
        )];
        let expanded = expand_all_day_blocks(blocks.clone(), &chrono_tz::America::New_York);
        assert_eq!(expanded, blocks);
    }

    #[test]
    fn all_day_blocks_snap_to_host_local_midnights() {
        // An all-day event on 2024-01-15 in UTC, seen by a New York host
        let blocks = vec![BusyBlock::new(
            utc("2024-01-15T00:00:00Z"),
            utc("2024-01-16T00:00:00Z"),
            BusySource::Calendar("primary".into()),
        )];
        let expanded = expand_all_day_blocks(blocks, &chrono_tz::America::New_York);

        // 2024-01-15T00:00Z is 2024-01-14 19:00 local, so the block covers
        // the local days Jan 14 and Jan 15
        assert_eq!(expanded[0].start_time, utc("2024-01-14T05:00:00Z"));
        assert_eq!(expanded[0].end_time, utc("2024-01-16T05:00:00Z"));
    }

    #[test]
    fn host_local_all_day_blocks_stay_on_their_day() {
        let tz = chrono_tz::America::New_York;
        // Midnight-to-midnight in the host zone already
        let blocks = vec![BusyBlock::new(
            utc("2024-01-15T05:00:00Z"),
            utc("2024-01-16T05:00:00Z"),
            BusySource::Calendar("primary".into()),
        )];
        let expanded = expand_all_day_blocks(blocks, &tz);
        assert_eq!(expanded[0].start_time, utc("2024-01-15T05:00:00Z"));
        assert_eq!(expanded[0].end_time, utc("2024-01-16T05:00:00Z"));
    }
}
