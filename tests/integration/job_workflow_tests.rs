/*!
 * End-to-end tests for job folders driven through the controller
 */

use anyhow::Result;
use std::sync::Arc;

use fusion_translator::app_controller::Controller;
use fusion_translator::containers::IndexEntry;
use fusion_translator::file_utils::FileManager;
use fusion_translator::job::{ExtractedFile, TranslatedFile};
use fusion_translator::providers::mock::MockTranslator;

use crate::common;

/// The sample page as the working mock translates it
fn expected_sample_output() -> String {
    common::SAMPLE_PAGE
        .replace("]Welcome to our shop[", "]German: Welcome to our shop[")
        .replace("<p>We build", "<p>German: We build")
        .replace("<p>Call us:", "<p>German: Call us:")
        .replace("]Orders ship", "]German: Orders ship")
        .replace("]Contact us[", "]German: Contact us[")
}

#[tokio::test]
async fn test_full_run_should_translate_and_merge_pages() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let src = temp_dir.path().join("products");
    common::create_test_file(&src, "home.txt", common::SAMPLE_PAGE)?;

    let mock = MockTranslator::working();
    let controller = Controller::with_translator(
        common::test_config(&temp_dir.path().join("jobs")),
        Arc::new(mock.clone()),
    );
    let job = controller.job(Some("german"));

    let summary = controller.run(&job, &src).await?;
    assert_eq!(summary.documents, 2);
    assert_eq!(summary.translated, 2);
    assert_eq!(summary.resolved_segments, 5);
    assert_eq!(summary.unresolved_segments, 0);
    assert!(summary.usage.total() > 0);
    assert_eq!(mock.call_count(), 2);

    let layout = job.layout();
    let index: Vec<IndexEntry> = FileManager::read_json(layout.index_file())?;
    assert_eq!(index.len(), 1);
    assert_eq!(index[0].source, "home.txt");
    assert_eq!(index[0].output, "home");
    assert_eq!(index[0].containers, 2);

    let extracted: ExtractedFile = FileManager::read_json(layout.extracted().join("home/container_1.json"))?;
    assert_eq!(extracted.source_key, "home/container_1.txt");
    assert_eq!(extracted.segments.len(), 3);

    let translated: TranslatedFile = FileManager::read_json(layout.translated().join("home/container_2.json"))?;
    assert_eq!(translated.segments.len(), 2);
    assert!(translated.unresolved.is_empty());

    let output = FileManager::read_to_string(layout.output().join("home.txt"))?;
    assert_eq!(output, expected_sample_output());
    assert!(FileManager::file_exists(layout.log_file()));
    Ok(())
}

#[tokio::test]
async fn test_translate_should_skip_finished_files() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let src = temp_dir.path().join("products");
    common::create_test_file(&src, "home.txt", common::SAMPLE_PAGE)?;

    let mock = MockTranslator::working();
    let controller = Controller::with_translator(
        common::test_config(&temp_dir.path().join("jobs")),
        Arc::new(mock.clone()),
    );
    let job = controller.job(Some("german"));
    controller.run(&job, &src).await?;
    assert_eq!(mock.call_count(), 2);

    let report = controller.translate(&job).await?;
    assert_eq!(report.skipped, 2);
    assert_eq!(report.files, 0);
    assert_eq!(mock.call_count(), 2);

    let mut config = common::test_config(&temp_dir.path().join("jobs"));
    config.job.overwrite = true;
    let controller = Controller::with_translator(config, Arc::new(mock.clone()));
    let report = controller.translate(&job).await?;
    assert_eq!(report.files, 2);
    assert_eq!(report.items, 5);
    assert_eq!(mock.call_count(), 4);
    Ok(())
}

#[tokio::test]
async fn test_broken_container_should_keep_source_and_not_block_others() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let src = temp_dir.path().join("products");
    common::create_test_file(&src, "home.txt", common::SAMPLE_PAGE)?;
    common::create_test_file(&src, "blog/broken.txt", &format!("{}\n", common::BROKEN_CONTAINER))?;

    let controller = Controller::with_translator(
        common::test_config(&temp_dir.path().join("jobs")),
        Arc::new(MockTranslator::working()),
    );
    let job = controller.job(Some("german"));

    let summary = controller.run(&job, &src).await?;
    assert_eq!(summary.documents, 3);
    assert_eq!(summary.translated, 2);
    assert_eq!(summary.parse_failures.len(), 1);
    assert_eq!(summary.parse_failures[0].0, "blog/broken/container_1.txt");

    let layout = job.layout();
    assert!(!FileManager::file_exists(layout.extracted().join("blog/broken/container_1.json")));
    assert_eq!(
        FileManager::read_to_string(layout.output().join("blog/broken.txt"))?,
        format!("{}\n", common::BROKEN_CONTAINER)
    );
    assert_eq!(
        FileManager::read_to_string(layout.output().join("home.txt"))?,
        expected_sample_output()
    );
    Ok(())
}

#[tokio::test]
async fn test_unresolved_segments_should_keep_source_text() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let src = temp_dir.path().join("products");
    common::create_test_file(
        &src,
        "faq.txt",
        "[fusion_builder_container][fusion_text]<p>Press [Enter] to start</p><p>Plain words</p>[/fusion_text][/fusion_builder_container]",
    )?;

    let controller = Controller::with_translator(
        common::test_config(&temp_dir.path().join("jobs")),
        Arc::new(MockTranslator::bracket_stripping()),
    );
    let job = controller.job(Some("german"));

    let summary = controller.run(&job, &src).await?;
    assert_eq!(summary.resolved_segments, 1);
    assert_eq!(summary.unresolved_segments, 1);

    let translated: TranslatedFile = FileManager::read_json(job.layout().translated().join("faq/container_1.json"))?;
    assert_eq!(translated.unresolved.len(), 1);

    let output = FileManager::read_to_string(job.layout().output().join("faq.txt"))?;
    assert_eq!(
        output,
        "[fusion_builder_container][fusion_text]<p>Press [Enter] to start</p><p>German: Plain words</p>[/fusion_text][/fusion_builder_container]\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_apply_after_container_edit_should_not_misplace_translations() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let src = temp_dir.path().join("products");
    common::create_test_file(
        &src,
        "shop.txt",
        "[fusion_builder_container][fusion_text]<p>Buy the red chair</p><p>Free delivery</p>[/fusion_text][/fusion_builder_container]",
    )?;

    let controller = Controller::with_translator(
        common::test_config(&temp_dir.path().join("jobs")),
        Arc::new(MockTranslator::working()),
    );
    let job = controller.job(Some("german"));
    controller.run(&job, &src).await?;

    let edited = "[fusion_builder_container][fusion_text]<p>Free delivery</p>[/fusion_text][/fusion_builder_container]";
    FileManager::write_to_file(job.layout().containers().join("shop/container_1.txt"), edited)?;

    let summary = controller.apply(&job)?;
    assert_eq!(summary.resolved_segments, 0);
    assert_eq!(summary.unresolved_segments, 1);

    let applied = FileManager::read_to_string(job.layout().applied().join("shop/container_1.txt"))?;
    assert_eq!(applied, edited);
    assert!(!applied.contains("Buy the red chair"));
    Ok(())
}

#[tokio::test]
async fn test_apply_without_translations_should_fail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let src = temp_dir.path().join("products");
    common::create_test_file(&src, "home.txt", common::SAMPLE_PAGE)?;

    let controller = Controller::with_translator(
        common::test_config(&temp_dir.path().join("jobs")),
        Arc::new(MockTranslator::working()),
    );
    let job = controller.job(Some("german"));
    job.layout().create_dirs()?;
    controller.export(&job, &src)?;
    controller.extract(&job)?;

    let err = controller.apply(&job).unwrap_err();
    assert!(format!("{:#}", err).contains("Missing translations for home/container_1.txt"));
    Ok(())
}

#[test]
fn test_stages_on_missing_folders_should_fail() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::with_translator(
        common::test_config(&temp_dir.path().join("jobs")),
        Arc::new(MockTranslator::working()),
    );
    let job = controller.job(Some("german"));

    assert!(controller.export(&job, &temp_dir.path().join("nowhere")).is_err());
    assert!(controller.extract(&job).is_err());

    let result = tokio_test::block_on(async { controller.translate(&job).await });
    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains("Folder does not exist"));
    Ok(())
}
