#![allow(clippy::too_many_lines)]
//! Example: offline cache, list reconciliation, and panel routing
//!
//! This example demonstrates the client-side state engine with no
//! network and no credentials:
//! 1. Seed the thread cache the way a first sync would
//! 2. Paint the list straight from the cache
//! 3. Fold a "freshly fetched" page in with `merge_threads`
//! 4. Reopen the database to show the offline restart path
//! 5. Route the cached threads into panels and print each panel's
//!    provider-query translation
//!
//! ## Running
//!
//! ```bash
//! cargo run --package switchboard-core --example offline_cache
//! ```

use std::collections::HashSet;

use chrono::{Duration, Utc};
use switchboard_core::{
    Attachment, BodyFormat, CacheRepository, EmailAddress, MergeMode, MessageView, Panel,
    PanelRule, RuleAction, RuleField, RuleMatcher, ThreadDetail, ThreadMetadata, merge_threads,
};

fn thread(id: &str, subject: &str, from: &str, hours_ago: i64, unread: bool) -> ThreadMetadata {
    let mut labels = HashSet::from(["INBOX".to_string()]);
    if unread {
        labels.insert("UNREAD".to_string());
    }
    ThreadMetadata {
        id: id.to_string(),
        subject: subject.to_string(),
        from: EmailAddress::parse(from),
        to: "me@corp.example.com".to_string(),
        date: Utc::now() - Duration::hours(hours_ago),
        snippet: format!("{subject} ..."),
        labels,
        message_count: 1,
    }
}

fn substring_rule(field: RuleField, fragment: &str, action: RuleAction) -> PanelRule {
    PanelRule {
        field,
        matcher: RuleMatcher::Substring {
            addresses: vec![fragment.to_string()],
        },
        action,
    }
}

fn print_rows(rows: &[ThreadMetadata]) {
    println!("─────────────────────────────────────────────────────────────");
    for row in rows {
        let marker = if row.is_unread() { "●" } else { " " };
        println!("  {marker} {:<24} {}", row.subject, row.from);
    }
    println!("─────────────────────────────────────────────────────────────");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Switchboard - Offline Cache Walkthrough");
    println!("=======================================\n");

    let db_path = std::env::temp_dir().join("switchboard_offline_cache_demo.db");
    let _ = std::fs::remove_file(&db_path);
    let db_path = db_path.to_string_lossy().into_owned();

    // Step 1: first sync. A real client would get these rows from the
    // provider; here we seed them directly.
    println!("Step 1: seeding the cache at {db_path}");
    let repo = CacheRepository::new(&db_path).await?;
    let synced = vec![
        thread("t-standup", "Standup notes", "Boss <boss@corp.example.com>", 1, true),
        thread("t-build", "Build #4812 failed", "alerts@ci.example.com", 3, true),
        thread("t-weekly", "This week in Rust", "newsletter@updates.example.com", 8, false),
        thread("t-dinner", "Dinner on Friday?", "Sam <sam@gmail.example>", 20, false),
    ];
    repo.put_metadata_batch(&synced).await?;
    println!("✓ Cached {} threads\n", synced.len());

    // Step 2: paint from cache. This is what the UI shows before any
    // network call completes.
    println!("Step 2: list painted straight from the cache");
    let cached: Vec<ThreadMetadata> = repo
        .get_all_metadata()
        .await?
        .into_iter()
        .map(|entry| entry.data)
        .collect();
    print_rows(&cached);
    println!();

    // Step 3: a fresh page arrives. One known thread got a reply, one
    // thread is brand new. Refresh mode replaces in place, prepends
    // what is new, and never drops unmentioned rows.
    println!("Step 3: folding in a fresh page (refresh mode)");
    let mut updated = thread("t-standup", "Standup notes", "Boss <boss@corp.example.com>", 0, true);
    updated.message_count = 3;
    updated.snippet = "Re: Standup notes ...".to_string();
    let fresh_page = vec![
        thread("t-deploy", "Deploy window tonight", "alerts@ci.example.com", 0, true),
        updated,
    ];
    let merged = merge_threads(&cached, &fresh_page, MergeMode::Refresh);
    repo.put_metadata_batch(&merged).await?;
    print_rows(&merged);
    println!("✓ {} threads after merge, nothing lost\n", merged.len());

    // Step 4: cache a full thread detail, then reopen the database to
    // show what a cold start with no network can still serve.
    println!("Step 4: restart from disk");
    let detail = ThreadDetail {
        id: "t-standup".to_string(),
        subject: "Standup notes".to_string(),
        labels: HashSet::from(["INBOX".to_string(), "UNREAD".to_string()]),
        messages: vec![MessageView {
            id: "m-1".to_string(),
            from: EmailAddress::parse("Boss <boss@corp.example.com>"),
            to: "me@corp.example.com".to_string(),
            subject: "Standup notes".to_string(),
            date: Utc::now() - Duration::hours(1),
            snippet: "Standup notes ...".to_string(),
            body: "<p>Notes attached.</p>".to_string(),
            body_format: BodyFormat::Html,
            labels: HashSet::from(["UNREAD".to_string()]),
            attachments: vec![Attachment {
                filename: "notes.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                size: 48_213,
                attachment_id: "att-notes".to_string(),
                message_id: "m-1".to_string(),
            }],
        }],
    };
    repo.put_detail(&detail).await?;
    drop(repo);

    let reopened = CacheRepository::new(&db_path).await?;
    let stats = reopened.stats().await?;
    println!(
        "✓ Reopened: {} metadata rows, {} detail rows",
        stats.metadata_count, stats.detail_count
    );
    if let Some(entry) = reopened.get_detail("t-standup").await? {
        println!(
            "✓ Detail for {:?} cached at {} with {} attachment(s)",
            entry.data.subject,
            entry.cached_at.format("%H:%M:%S"),
            entry.data.messages[0].attachments.len()
        );
    }
    let attachment_index = reopened.attachment_index().await?;
    println!("✓ Attachment index covers {} thread(s)\n", attachment_index.len());

    // Step 5: panel routing. First panel to claim a thread wins; the
    // empty-ruled panel is the catch-all at the end.
    println!("Step 5: routing threads into panels");
    let panels = vec![
        Panel {
            name: "Work".to_string(),
            rules: vec![
                substring_rule(RuleField::Sender, "noreply@", RuleAction::Reject),
                substring_rule(RuleField::Sender, "@corp.example.com", RuleAction::Accept),
            ],
        },
        Panel {
            name: "Ops".to_string(),
            rules: vec![PanelRule {
                field: RuleField::Sender,
                matcher: RuleMatcher::Pattern {
                    expression: "(alerts|builds)@ci\\.".to_string(),
                },
                action: RuleAction::Accept,
            }],
        },
        Panel {
            name: "Feeds".to_string(),
            rules: vec![substring_rule(RuleField::Sender, "newsletter@", RuleAction::Accept)],
        },
        Panel {
            name: "Everything else".to_string(),
            rules: vec![],
        },
    ];

    let rows: Vec<ThreadMetadata> = reopened
        .get_all_metadata()
        .await?
        .into_iter()
        .map(|entry| entry.data)
        .collect();
    println!("─────────────────────────────────────────────────────────────");
    for row in &rows {
        let from = row.from.to_string();
        let claimed = panels
            .iter()
            .find(|panel| panel.matches_thread(&from, &row.to))
            .map_or("(unclaimed)", |panel| panel.name.as_str());
        println!("  {:<16} ← {}", claimed, row.subject);
    }
    println!("─────────────────────────────────────────────────────────────\n");

    // The count-estimate path translates each panel into a provider
    // query; the catch-all negates the other panels' accept terms.
    println!("Provider-query translations for count estimates:");
    let accepts: Vec<String> = panels
        .iter()
        .filter(|panel| !panel.rules.is_empty())
        .map(Panel::accept_query)
        .collect();
    for panel in &panels {
        let query = if panel.rules.is_empty() {
            panel.to_provider_query(Some(&accepts))
        } else {
            panel.to_provider_query(None)
        };
        println!("  {:<16} {query}", panel.name);
    }
    println!();

    let _ = std::fs::remove_file(&db_path);
    println!("┌─────────────────────────────────────────────────────────────┐");
    println!("│  Every read above came from the local cache: the list, the  │");
    println!("│  detail, and the attachment index all work with no network. │");
    println!("└─────────────────────────────────────────────────────────────┘");

    Ok(())
}
