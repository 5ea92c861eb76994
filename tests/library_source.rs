use rb_library::catalog::{Catalog, MemoryCatalog};
use rb_library::import::{ImportEvent, MetadataScanner, ScanError};
use rb_library::model::{path_to_uri, Entry, EntryType, Track};
use rb_library::transfer::{FileCopier, TrackTransfer, TransferError};
use rb_library::{LibrarySettings, LibrarySource, SourceChannels};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

/// Scanner that marks every file it sees as rescanned
struct RescanScanner;

impl MetadataScanner for RescanScanner {
    fn scan(&self, uri: &str) -> Result<Track, ScanError> {
        let mut track = Track::new(uri);
        track.title = "Rescanned".to_string();
        Ok(track)
    }
}

/// Transfer worker that runs out of space on every track
#[derive(Default)]
struct FullDisk {
    calls: AtomicUsize,
}

impl TrackTransfer for FullDisk {
    fn can_copy(&self, _track: &Track) -> bool {
        true
    }

    fn extension(&self, _track: &Track) -> Option<String> {
        Some("ogg".to_string())
    }

    fn transfer(&self, _source: &str, _dest: &str) -> Result<u64, TransferError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TransferError::OutOfSpace)
    }
}

struct Fixture {
    _dir: TempDir,
    src: std::path::PathBuf,
    library: std::path::PathBuf,
    catalog: Arc<MemoryCatalog>,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let library = dir.path().join("library");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&library).unwrap();
        Self {
            _dir: dir,
            src,
            library,
            catalog: Arc::new(MemoryCatalog::new()),
        }
    }

    fn settings(&self) -> LibrarySettings {
        LibrarySettings::new(path_to_uri(&self.library)).with_import_delay(Duration::from_millis(10))
    }

    fn source(&self, transfer: Arc<dyn TrackTransfer>) -> (LibrarySource, SourceChannels) {
        LibrarySource::new(
            self.settings(),
            self.catalog.clone(),
            Arc::new(RescanScanner),
            transfer,
        )
    }

    /// Entry from another source, with its file created unless `missing`
    fn external(&self, name: &str, number: u32, missing: bool) -> Entry {
        let path = self.src.join(format!("{}.ogg", name));
        if !missing {
            fs::write(&path, format!("audio for {}", name)).unwrap();
        }
        Entry::external(Track {
            title: name.to_string(),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            track_number: Some(number),
            ..Track::new(path_to_uri(&path))
        })
    }

    fn library_file(&self, relative: &str) -> std::path::PathBuf {
        self.library.join(relative)
    }
}

async fn wait_for_complete(channels: &mut SourceChannels) {
    loop {
        let event = timeout(Duration::from_secs(5), channels.import_events.recv())
            .await
            .expect("timed out waiting for import")
            .expect("import queue closed");
        if matches!(event, ImportEvent::Complete(_)) {
            return;
        }
    }
}

#[tokio::test]
async fn test_paste_without_eligible_entries_starts_nothing() {
    let fixture = Fixture::new();
    let (source, _channels) = fixture.source(Arc::new(FileCopier::new()));

    // A library song outside the library root is still the library's own
    let own = Entry::song(fixture.external("Own", 1, false).track);
    let remote = Entry::external(Track::new("http://example.com/stream.ogg"));

    assert!(source.paste(vec![own, remote]).unwrap().is_none());
    assert!(source.paste(Vec::new()).unwrap().is_none());
    assert!(!fixture.library_file("Artist/Album/01 - Own.ogg").exists());
}

#[tokio::test]
async fn test_paste_copies_into_layout_and_reimports() {
    let fixture = Fixture::new();
    let (source, mut channels) = fixture.source(Arc::new(FileCopier::new()));
    let entry = fixture.external("Title", 1, false);

    let batch = source.paste(vec![entry.clone()]).unwrap().unwrap();
    let summary = batch.wait().await;
    assert_eq!(summary.total, 1);
    assert!(!summary.cancelled);
    assert_eq!(summary.transferred.len(), 1);

    let copied = fixture.library_file("Artist/Album/01 - Title.ogg");
    assert_eq!(fs::read_to_string(&copied).unwrap(), "audio for Title");

    let (from, dest) = &summary.transferred[0];
    assert_eq!(from, entry.location());
    assert!(dest.ends_with("/library/Artist/Album/01%20-%20Title.ogg"));

    // The copy is scanned from its new location
    wait_for_complete(&mut channels).await;
    let copy = fixture.catalog.lookup(dest).unwrap();
    assert_eq!(copy.entry_type, EntryType::Song);
    assert_eq!(copy.track.title, "Rescanned");
    assert!(channels.transfer_reports.try_recv().is_err());
}

#[tokio::test]
async fn test_existing_destination_is_skipped_silently() {
    let fixture = Fixture::new();
    let (source, mut channels) = fixture.source(Arc::new(FileCopier::new()));
    let entry = fixture.external("Title", 1, false);

    let existing = fixture.library_file("Artist/Album/01 - Title.ogg");
    fs::create_dir_all(existing.parent().unwrap()).unwrap();
    fs::write(&existing, "already here").unwrap();

    let summary = source.paste(vec![entry]).unwrap().unwrap().wait().await;
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert!(summary.transferred.is_empty());
    assert_eq!(fs::read_to_string(&existing).unwrap(), "already here");
    assert!(channels.transfer_reports.try_recv().is_err());
}

#[tokio::test]
async fn test_fatal_error_stops_the_batch() {
    let fixture = Fixture::new();
    let disk = Arc::new(FullDisk::default());
    let (source, mut channels) = fixture.source(disk.clone());

    let entries = vec![
        fixture.external("One", 1, true),
        fixture.external("Two", 2, true),
        fixture.external("Three", 3, true),
    ];
    let summary = source.paste(entries).unwrap().unwrap().wait().await;

    assert!(summary.cancelled);
    assert_eq!(summary.failed, 1);
    assert_eq!(disk.calls.load(Ordering::SeqCst), 1);

    let report = channels.transfer_reports.recv().await.unwrap();
    assert!(report.fatal);
    assert!(report.source.ends_with("/src/One.ogg"));
    assert!(channels.transfer_reports.try_recv().is_err());
}

#[tokio::test]
async fn test_other_errors_are_reported_and_batch_continues() {
    let fixture = Fixture::new();
    let (source, mut channels) = fixture.source(Arc::new(FileCopier::new()));

    let entries = vec![fixture.external("Gone", 1, true), fixture.external("Here", 2, false)];
    let summary = source.paste(entries).unwrap().unwrap().wait().await;

    assert!(!summary.cancelled);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.transferred.len(), 1);
    assert!(fixture.library_file("Artist/Album/02 - Here.ogg").is_file());

    let report = channels.transfer_reports.recv().await.unwrap();
    assert!(!report.fatal);
    assert!(report.message.contains("not found"));
}

#[tokio::test]
async fn test_received_uris_are_pasted_or_imported() {
    let fixture = Fixture::new();
    let foreign = fixture.external("Foreign", 4, false);
    fixture.catalog.commit(foreign.clone());
    let own = Entry::song(fixture.external("Own", 5, false).track);
    fixture.catalog.commit(own.clone());
    let unknown = path_to_uri(&fixture.src.join("new.ogg"));

    let (source, mut channels) = fixture.source(Arc::new(FileCopier::new()));
    let batch = source
        .receive_uris(vec![
            foreign.location().to_string(),
            own.location().to_string(),
            unknown.clone(),
        ])
        .await
        .unwrap()
        .unwrap();

    let summary = batch.wait().await;
    assert_eq!(summary.total, 1);
    assert_eq!(summary.transferred.len(), 1);
    assert!(fixture.library_file("Artist/Album/04 - Foreign.ogg").is_file());
    assert!(!fixture.library_file("Artist/Album/05 - Own.ogg").exists());

    wait_for_complete(&mut channels).await;
    assert!(fixture.catalog.lookup(&unknown).is_some());
}

#[tokio::test]
async fn test_received_uris_without_layout_still_import() {
    let fixture = Fixture::new();
    let foreign = fixture.external("Foreign", 1, false);
    fixture.catalog.commit(foreign.clone());
    let unknown = path_to_uri(&fixture.src.join("new.ogg"));

    let (source, _channels) = LibrarySource::new(
        LibrarySettings::default().with_import_delay(Duration::from_secs(60)),
        fixture.catalog.clone(),
        Arc::new(RescanScanner),
        Arc::new(FileCopier::new()),
    );
    assert!(!source.can_paste());

    let batch = source
        .receive_uris(vec![unknown.clone(), foreign.location().to_string()])
        .await
        .unwrap();
    assert!(batch.is_none());

    let jobs = source.import_queue().jobs().await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].uris, vec![unknown]);
}

#[tokio::test]
async fn test_add_uri_notify_and_status() {
    let fixture = Fixture::new();
    let (source, _channels) = fixture.source(Arc::new(FileCopier::new()));
    let uri = path_to_uri(Path::new("/music/a.ogg"));

    let (job, done) = source.add_uri_notify(uri.clone()).await.unwrap();
    let status = source.status().await.unwrap().unwrap();
    assert_eq!(status.job, job);
    assert_eq!(status.total, 1);

    let summary = timeout(Duration::from_secs(5), done).await.unwrap().unwrap();
    assert_eq!(summary.imported, 1);
    assert_eq!(source.status().await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_source_cancels_imports() {
    let fixture = Fixture::new();
    let (source, mut channels) = fixture.source(Arc::new(FileCopier::new()));

    source.add_uri("file:///music/a.ogg").await.unwrap();
    drop(source);

    assert_eq!(channels.import_events.recv().await, None);
    assert_eq!(fixture.catalog.snapshot().len(), 0);
}
