use std::fs::{self, File};
use std::io::Read;

use fanbox_engine::{ensure_output_dir, ArchiveError, ArchiveWriter, ZipArchiveWriter};
use tempfile::TempDir;
use zip::ZipArchive;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn zip_is_persisted_only_on_close() {
    let temp = TempDir::new().unwrap();
    let mut writer = ZipArchiveWriter::create(temp.path(), "artist.zip").unwrap();
    writer.add_file("artist/index.html", b"<html></html>").unwrap();
    writer.add_file("artist/post--1/empty.bin", b"").unwrap();
    assert!(!writer.path().exists());

    writer.close().unwrap();
    writer.close().unwrap();

    let mut archive = ZipArchive::new(File::open(writer.path()).unwrap()).unwrap();
    let mut names: Vec<&str> = archive.file_names().collect();
    names.sort_unstable();
    assert_eq!(names, vec!["artist/index.html", "artist/post--1/empty.bin"]);

    let mut content = String::new();
    archive
        .by_name("artist/index.html")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "<html></html>");
    assert_eq!(archive.by_name("artist/post--1/empty.bin").unwrap().size(), 0);
}

#[test]
fn closed_writer_rejects_entries() {
    let temp = TempDir::new().unwrap();
    let mut writer = ZipArchiveWriter::create(temp.path(), "a.zip").unwrap();
    writer.close().unwrap();

    let err = writer.add_file("late.txt", b"x").unwrap_err();
    assert!(matches!(err, ArchiveError::Closed));
}

#[test]
fn existing_archive_is_replaced() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.zip"), "stale").unwrap();

    let mut writer = ZipArchiveWriter::create(temp.path(), "a.zip").unwrap();
    writer.add_file("fresh.txt", b"new").unwrap();
    writer.close().unwrap();

    let archive = ZipArchive::new(File::open(temp.path().join("a.zip")).unwrap()).unwrap();
    assert_eq!(archive.len(), 1);
}

#[test]
fn file_in_place_of_output_dir_is_an_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    assert!(ensure_output_dir(&file_path).is_err());
    assert!(ZipArchiveWriter::create(&file_path, "a.zip").is_err());
}
