use anyhow::{anyhow, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod export;
mod ledger;
mod migrate;
mod narrative;
mod render;
mod schema;
mod share;
mod store;
mod util;

use cli::{
    Command, ComposeArgs, EntryArgs, ExportArgs, ListArgs, RootArgs, SetArgs, ShareArgs, ShowArgs,
};
use ledger::{HistoryLedger, SystemLedger};
use schema::ReportRecord;
use store::{DraftStore, FileStorage, Storage};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = RootArgs::parse();
    let mut store = DraftStore::new(FileStorage::open_default()?);
    let state = store.load_or_default()?;
    for note in state.notes.iter() {
        tracing::info!(note, "migrated saved report data");
    }
    let mut draft = state.draft;
    let mut ledger = HistoryLedger::new(state.history);
    if state.migrated_legacy {
        // Rewrite in the canonical shapes so the legacy blob cannot shadow
        // later draft edits.
        store.save_draft(&draft)?;
        store.save_history(ledger.list())?;
    }

    match args.command {
        Command::New => cmd_new(&mut store),
        Command::Set(set) => cmd_set(&set, &mut store, &mut draft),
        Command::Show(show) => cmd_show(&show, &draft, &ledger),
        Command::Save => cmd_save(&mut store, &draft, &mut ledger),
        Command::List(list) => cmd_list(&list, &ledger),
        Command::Load(entry) => cmd_load(&entry, &mut store, &mut draft, &ledger),
        Command::Delete(entry) => cmd_delete(&entry, &mut store, &mut ledger),
        Command::Export(export) => cmd_export(&export, &draft, &ledger),
        Command::Compose(compose) => cmd_compose(&compose, &mut store, &mut draft),
        Command::Share(share) => cmd_share(&share, &draft),
    }
}

fn cmd_new<S: Storage>(store: &mut DraftStore<S>) -> Result<()> {
    store.reset_draft()?;
    println!("Working draft reset.");
    Ok(())
}

fn cmd_set<S: Storage>(
    args: &SetArgs,
    store: &mut DraftStore<S>,
    draft: &mut ReportRecord,
) -> Result<()> {
    let dropped = apply_set(args, draft)?;
    if dropped > 0 {
        tracing::warn!(dropped, "photo cap reached; extra images were dropped");
    }
    store.save_draft(draft)?;
    println!("Draft updated: {}", draft.display_title());
    Ok(())
}

/// Apply only the flags that were given; everything else keeps its value.
fn apply_set(args: &SetArgs, draft: &mut ReportRecord) -> Result<usize> {
    let fields = [
        (&args.unit, &mut draft.unit_name),
        (&args.program, &mut draft.program),
        (&args.anjuran, &mut draft.organiser),
        (&args.tarikh, &mut draft.date),
        (&args.masa, &mut draft.time),
        (&args.hadir, &mut draft.attendee_count),
        (&args.tidak_hadir, &mut draft.absentee_count),
        (&args.penasihat, &mut draft.advisor_name),
        (&args.laporan, &mut draft.narrative),
        (&args.penyedia, &mut draft.preparer_name),
        (&args.jawatan, &mut draft.preparer_role),
    ];
    for (flag, field) in fields {
        if let Some(value) = flag {
            *field = value.clone();
        }
    }

    if args.clear_images {
        draft.images.clear();
    }
    let mut dropped = 0;
    for path in &args.image {
        let data_uri = util::image_data_uri(path)?;
        if !draft.push_image(data_uri) {
            dropped += 1;
        }
    }
    Ok(dropped)
}

fn cmd_show(args: &ShowArgs, draft: &ReportRecord, ledger: &SystemLedger) -> Result<()> {
    let rendered = match &args.id {
        Some(id) => {
            let entry = ledger
                .find(id)
                .ok_or_else(|| anyhow!("no saved entry with id {id}"))?;
            serde_json::to_string_pretty(entry)?
        }
        None => serde_json::to_string_pretty(draft)?,
    };
    println!("{rendered}");
    Ok(())
}

fn cmd_save<S: Storage>(
    store: &mut DraftStore<S>,
    draft: &ReportRecord,
    ledger: &mut SystemLedger,
) -> Result<()> {
    let id = ledger.append(draft, store)?.id.clone();
    println!(
        "Saved '{}' as entry {} ({} in history).",
        draft.display_title(),
        id,
        ledger.len()
    );
    Ok(())
}

fn cmd_list(args: &ListArgs, ledger: &SystemLedger) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(ledger.list())?);
        return Ok(());
    }
    if ledger.is_empty() {
        println!("Tiada draf laporan dijumpai.");
        return Ok(());
    }
    for entry in ledger.list() {
        println!(
            "{:<18} {:<26} {}",
            entry.id,
            entry.saved_at,
            entry.record.display_title()
        );
    }
    Ok(())
}

fn cmd_load<S: Storage>(
    args: &EntryArgs,
    store: &mut DraftStore<S>,
    draft: &mut ReportRecord,
    ledger: &SystemLedger,
) -> Result<()> {
    let entry = ledger
        .find(&args.id)
        .ok_or_else(|| anyhow!("no saved entry with id {}", args.id))?;
    *draft = entry.record.clone();
    store.save_draft(draft)?;
    println!("Loaded '{}' into the working draft.", draft.display_title());
    Ok(())
}

fn cmd_delete<S: Storage>(
    args: &EntryArgs,
    store: &mut DraftStore<S>,
    ledger: &mut SystemLedger,
) -> Result<()> {
    if ledger.remove(&args.id, store)? {
        println!("Deleted entry {}.", args.id);
    } else {
        println!("No entry with id {}; nothing to delete.", args.id);
    }
    Ok(())
}

fn cmd_export(args: &ExportArgs, draft: &ReportRecord, ledger: &SystemLedger) -> Result<()> {
    let record = match &args.id {
        Some(id) => {
            &ledger
                .find(id)
                .ok_or_else(|| anyhow!("no saved entry with id {id}"))?
                .record
        }
        None => draft,
    };
    let path = export::export_report(record, &args.out_dir)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn cmd_compose<S: Storage>(
    args: &ComposeArgs,
    store: &mut DraftStore<S>,
    draft: &mut ReportRecord,
) -> Result<()> {
    // The draft's narrative is only touched once the generator succeeds.
    let text = narrative::generate_narrative(draft, args.length)?;
    draft.narrative = text;
    store.save_draft(draft)?;
    println!(
        "Narrative drafted ({} characters). Review with `lapor show`.",
        draft.narrative.chars().count()
    );
    Ok(())
}

fn cmd_share(args: &ShareArgs, draft: &ReportRecord) -> Result<()> {
    let digits = share::normalize_phone(&args.phone)?;
    let message = share::share_message(draft);
    let url = share::whatsapp_url(&digits, &message);
    println!("{message}\n");
    println!("WhatsApp: {url}");
    println!("Drive:    {}", share::DRIVE_FOLDER_LINK);
    if args.open {
        share::open_external(&url)?;
    }
    Ok(())
}
