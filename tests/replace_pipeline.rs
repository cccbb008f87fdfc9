//! End-to-end runs of the staged conversion pipeline against temp trees.

use assert_fs::{TempDir, prelude::*};
use predicates::prelude::*;
use scoped_replace::core::{KeyMode, ReplaceError, RunOptions, Silent, execute, staging::STAGING_MARKER};

/// Options targeting `<tmp>/proj` with staging kept inside the temp dir.
fn options(
    tmp: &TempDir,
    keys: &[&str],
    from: &str,
    to: &str,
) -> RunOptions
{
    RunOptions::new(
        tmp.child("proj")
            .path(),
        keys.iter()
            .map(|k| k.to_string())
            .collect(),
        from,
        to,
    )
    .with_staging_dir(
        tmp.child(".staging")
            .path(),
    )
}

#[test]
fn concrete_example_rewrites_inside_match()
{
    let tmp = TempDir::new().unwrap();
    tmp.child("proj/a.txt")
        .write_str("foobar")
        .unwrap();

    let summary = execute(&options(&tmp, &["foo"], "o", "0"), &Silent).unwrap();

    assert_eq!(summary.files, 1);
    assert_eq!(summary.committed, 1);
    tmp.child("proj/a.txt")
        .assert("f00bar");
}

#[test]
fn substitution_is_scoped_to_the_match()
{
    let tmp = TempDir::new().unwrap();
    tmp.child("proj/x.txt")
        .write_str("x_foo_bar_y")
        .unwrap();

    execute(&options(&tmp, &["foo_bar"], "_", "-"), &Silent).unwrap();

    tmp.child("proj/x.txt")
        .assert("x_foo-bar_y");
}

#[test]
fn longer_key_takes_precedence()
{
    let tmp = TempDir::new().unwrap();
    tmp.child("proj/k.txt")
        .write_str("abcabc ab")
        .unwrap();

    // Only the three-letter matches contain a 'c' to rewrite
    execute(&options(&tmp, &["ab", "abc"], "c", "C"), &Silent).unwrap();

    tmp.child("proj/k.txt")
        .assert("abCabC ab");
}

#[test]
fn extension_filter_leaves_other_files_alone()
{
    let tmp = TempDir::new().unwrap();
    tmp.child("proj/src/lib.rs")
        .write_str("foo_bar")
        .unwrap();
    tmp.child("proj/src/notes.md")
        .write_str("foo_bar")
        .unwrap();
    tmp.child("proj/deep/nested/mod.rs")
        .write_str("foo_bar")
        .unwrap();

    let opts = options(&tmp, &["foo_bar"], "_", "-").with_extension("rs");
    let summary = execute(&opts, &Silent).unwrap();

    assert_eq!(summary.files, 2);
    tmp.child("proj/src/lib.rs")
        .assert("foo-bar");
    tmp.child("proj/deep/nested/mod.rs")
        .assert("foo-bar");
    tmp.child("proj/src/notes.md")
        .assert("foo_bar");
}

#[test]
fn batches_apply_cumulatively_past_the_cap()
{
    let tmp = TempDir::new().unwrap();
    tmp.child("proj/c.txt")
        .write_str("cab")
        .unwrap();

    // "cab" + 49 same-length fillers fill batch 0; "aa" lands in batch 1
    let mut keys: Vec<String> = vec!["cab".into()];
    keys.extend((0..49).map(|i| format!("q{i:02}")));
    keys.push("aa".into());
    let key_refs: Vec<&str> = keys
        .iter()
        .map(String::as_str)
        .collect();

    let opts = options(&tmp, &key_refs, "a", "aa").with_mode(KeyMode::Literal);
    let summary = execute(&opts, &Silent).unwrap();

    assert_eq!(summary.batches, 2);
    assert_eq!(summary.jobs, 2);
    // batch 1 sees batch 0's "caab", not the original "cab"
    tmp.child("proj/c.txt")
        .assert("caaaab");
}

#[test]
fn one_failure_leaves_every_original_untouched()
{
    let tmp = TempDir::new().unwrap();
    for i in 0..5
    {
        tmp.child(format!("proj/ok_{i}.txt"))
            .write_str("foo_bar")
            .unwrap();
    }
    tmp.child("proj/broken.txt")
        .write_binary(&[b'f', 0xff, 0xfe, b'_'])
        .unwrap();

    let err = execute(&options(&tmp, &["foo_bar"], "_", "-").with_chunk_size(2), &Silent)
        .unwrap_err();

    match &err
    {
        ReplaceError::Aggregate { failed, total, first } =>
        {
            assert_eq!((*failed, *total), (1, 6));
            assert!(
                first
                    .path
                    .ends_with("broken.txt")
            );
        }
        other => panic!("expected aggregate failure, got {other:?}"),
    }

    for i in 0..5
    {
        tmp.child(format!("proj/ok_{i}.txt"))
            .assert("foo_bar");
    }
    tmp.child(".staging")
        .assert(predicate::path::missing());
}

#[test]
fn staging_is_absent_before_and_after()
{
    let tmp = TempDir::new().unwrap();
    tmp.child("proj/a.txt")
        .write_str("foo")
        .unwrap();

    // Remnant of an interrupted run must neither survive nor be committed
    tmp.child(".staging/stale.txt")
        .write_str("stale")
        .unwrap();
    tmp.child(".staging")
        .child(STAGING_MARKER)
        .touch()
        .unwrap();

    execute(&options(&tmp, &["foo"], "o", "0"), &Silent).unwrap();

    tmp.child(".staging")
        .assert(predicate::path::missing());
    tmp.child("proj/stale.txt")
        .assert(predicate::path::missing());
    tmp.child("proj/a.txt")
        .assert("f00");
}

#[test]
fn staging_inside_target_is_not_scanned()
{
    let tmp = TempDir::new().unwrap();
    tmp.child("proj/a.txt")
        .write_str("foo")
        .unwrap();

    let opts = options(&tmp, &["foo"], "o", "0").with_staging_dir(
        tmp.child("proj/.srr-staging")
            .path(),
    );
    let summary = execute(&opts, &Silent).unwrap();

    assert_eq!(summary.files, 1);
    tmp.child("proj/a.txt")
        .assert("f00");
    tmp.child("proj/.srr-staging")
        .assert(predicate::path::missing());
}

#[test]
fn identical_from_and_to_keeps_bytes()
{
    let tmp = TempDir::new().unwrap();
    let body = "let foo_bar = foo_baz;\r\n// fóo_bär\n";
    tmp.child("proj/a.rs")
        .write_str(body)
        .unwrap();
    tmp.child("proj/sub/b.rs")
        .write_str(body)
        .unwrap();

    let summary = execute(&options(&tmp, &["foo_ba.", "fóo"], "_", "_"), &Silent).unwrap();

    assert_eq!(summary.changed, 0);
    tmp.child("proj/a.rs")
        .assert(body);
    tmp.child("proj/sub/b.rs")
        .assert(body);
}

#[test]
fn dry_run_reports_without_committing()
{
    let tmp = TempDir::new().unwrap();
    tmp.child("proj/a.txt")
        .write_str("foo")
        .unwrap();
    tmp.child("proj/b.txt")
        .write_str("bar")
        .unwrap();

    let summary = execute(&options(&tmp, &["foo"], "o", "0").with_dry_run(true), &Silent).unwrap();

    assert_eq!(summary.changed, 1);
    assert_eq!(summary.committed, 0);
    tmp.child("proj/a.txt")
        .assert("foo");
    tmp.child(".staging")
        .assert(predicate::path::missing());
}

#[test]
fn existing_directory_is_never_used_as_staging()
{
    let tmp = TempDir::new().unwrap();
    tmp.child("proj/a.txt")
        .write_str("foo")
        .unwrap();
    tmp.child("proj/src/keep.rs")
        .write_str("precious foo")
        .unwrap();

    let opts = options(&tmp, &["foo"], "o", "0").with_staging_dir(
        tmp.child("proj/src")
            .path(),
    );
    let err = execute(&opts, &Silent).unwrap_err();

    assert!(matches!(err, ReplaceError::InvalidOptions(_)));
    tmp.child("proj/src/keep.rs")
        .assert("precious foo");
    tmp.child("proj/a.txt")
        .assert("foo");
    tmp.child("proj/src")
        .child(STAGING_MARKER)
        .assert(predicate::path::missing());
}

#[cfg(unix)]
#[test]
fn symlink_in_target_aborts_before_conversion()
{
    let tmp = TempDir::new().unwrap();
    tmp.child("proj/a.txt")
        .write_str("foo")
        .unwrap();
    tmp.child("proj/link")
        .symlink_to_file(
            tmp.child("proj/a.txt")
                .path(),
        )
        .unwrap();

    let err = execute(&options(&tmp, &["foo"], "o", "0"), &Silent).unwrap_err();

    assert!(matches!(err, ReplaceError::Traversal(_)));
    assert!(err.originals_untouched());
    tmp.child("proj/a.txt")
        .assert("foo");
    tmp.child(".staging")
        .assert(predicate::path::missing());
}

#[test]
fn staging_under_a_regular_file_fails_to_initialize()
{
    let tmp = TempDir::new().unwrap();
    tmp.child("proj/a.txt")
        .write_str("foo")
        .unwrap();
    tmp.child("blocker")
        .write_str("not a directory")
        .unwrap();

    let opts = options(&tmp, &["foo"], "o", "0").with_staging_dir(
        tmp.child("blocker/stage")
            .path(),
    );
    let err = execute(&opts, &Silent).unwrap_err();

    assert!(matches!(err, ReplaceError::StagingInit { .. }));
    tmp.child("proj/a.txt")
        .assert("foo");
    tmp.child("blocker")
        .assert("not a directory");
}
