//! CLI argument parsing for the report workflow.
//!
//! The CLI is intentionally thin: every subcommand maps to one store or
//! collaborator operation, so the same core logic stays reusable and
//! testable without the terminal.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::narrative::NarrativeLength;

/// Root CLI entrypoint for the weekly report workflow.
#[derive(Parser, Debug)]
#[command(
    name = "lapor",
    version,
    about = "Weekly co-curricular activity report workflow",
    after_help = "Commands:\n  new                       Start a fresh working draft\n  set [--program ...]       Update fields on the working draft\n  show [--id <ID>]          Print the draft (or a saved entry) as JSON\n  save                      Snapshot the draft into the history ledger\n  list [--json]             List saved reports, newest first\n  load --id <ID>            Copy a saved entry back into the draft\n  delete --id <ID>          Remove a saved entry\n  export [--id <ID>]        Render and write the printable document\n  compose [--length ...]    Draft the narrative with the configured LM\n  share [--phone <NUM>]     Print the WhatsApp hand-off and Drive link\n\nExamples:\n  lapor set --program 'Perjumpaan Pengakap Bil. 1' --tarikh 2026-01-14\n  lapor set --image foto1.jpg --image foto2.jpg\n  lapor save\n  lapor export --out-dir ~/Laporan\n  lapor share --open",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level workflow commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    New,
    Set(SetArgs),
    Show(ShowArgs),
    Save,
    List(ListArgs),
    Load(EntryArgs),
    Delete(EntryArgs),
    Export(ExportArgs),
    Compose(ComposeArgs),
    Share(ShareArgs),
}

/// Field updates applied to the working draft. Only the flags given change.
#[derive(Parser, Debug, Default)]
#[command(about = "Update fields on the working draft")]
pub struct SetArgs {
    /// Kelab / unit name
    #[arg(long)]
    pub unit: Option<String>,

    /// Program / aktiviti name
    #[arg(long)]
    pub program: Option<String>,

    /// Anjuran (organising body)
    #[arg(long)]
    pub anjuran: Option<String>,

    /// Tarikh, ISO date (e.g. 2026-01-14)
    #[arg(long)]
    pub tarikh: Option<String>,

    /// Masa, free-form slot (e.g. '2:00 PM - 4:00 PM')
    #[arg(long)]
    pub masa: Option<String>,

    /// Bilangan murid hadir
    #[arg(long)]
    pub hadir: Option<String>,

    /// Bilangan murid tidak hadir
    #[arg(long, value_name = "COUNT")]
    pub tidak_hadir: Option<String>,

    /// Nama guru penasihat
    #[arg(long)]
    pub penasihat: Option<String>,

    /// Laporan / narrative text
    #[arg(long)]
    pub laporan: Option<String>,

    /// Nama penyedia
    #[arg(long)]
    pub penyedia: Option<String>,

    /// Jawatan penyedia
    #[arg(long)]
    pub jawatan: Option<String>,

    /// Attach an activity photo (repeatable, capped at six)
    #[arg(long, value_name = "PATH")]
    pub image: Vec<PathBuf>,

    /// Drop all attached photos before applying --image flags
    #[arg(long)]
    pub clear_images: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Print the working draft, or a saved entry, as JSON")]
pub struct ShowArgs {
    /// Saved entry id; omit for the working draft
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Parser, Debug)]
#[command(about = "List saved reports, newest first")]
pub struct ListArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Commands addressing one saved entry by id.
#[derive(Parser, Debug)]
pub struct EntryArgs {
    /// Saved entry id from `lapor list`
    #[arg(long)]
    pub id: String,
}

#[derive(Parser, Debug)]
#[command(about = "Render the report and write the printable document")]
pub struct ExportArgs {
    /// Saved entry id; omit to export the working draft
    #[arg(long)]
    pub id: Option<String>,

    /// Directory the document is written into
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,
}

#[derive(Parser, Debug)]
#[command(about = "Draft the narrative with the configured LM")]
pub struct ComposeArgs {
    /// Requested narrative length
    #[arg(long, value_enum, default_value_t = NarrativeLength::Medium)]
    pub length: NarrativeLength,
}

#[derive(Parser, Debug)]
#[command(about = "Print the WhatsApp hand-off message and Drive link")]
pub struct ShareArgs {
    /// Phone number of the PK Kokurikulum
    #[arg(long, default_value = crate::share::DEFAULT_PK_PHONE)]
    pub phone: String,

    /// Also open the WhatsApp link in the default handler
    #[arg(long)]
    pub open: bool,
}
