// src/report_tests.rs

#[cfg(test)]
mod tests {
    use crate::report_error::ReportError;
    use crate::report_io::*;
    use crate::report_table::ReportCategory;
    use rust_decimal_macros::dec;
    use std::fs::{self, File};
    use std::path::{Path, PathBuf};
    use std::time::{Duration, SystemTime};

    const HEADER: &str = "プロジェクト,工程,工程(不稼働),日付,時間\n";

    fn timesheet(rows: &[&str]) -> String {
        let mut csv = HEADER.to_string();
        for row in rows {
            csv.push_str(row);
            csv.push('\n');
        }
        csv
    }

    // Parses rendered report bytes (BOM stripped) back into string rows.
    fn parse_output(bytes: &[u8]) -> Vec<Vec<String>> {
        assert!(bytes.starts_with(b"\xEF\xBB\xBF"), "report must start with a BOM");
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(&bytes[3..])
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    fn write_file(dir: &Path, name: &str, contents: &str, modified_secs_ago: u64) -> PathBuf {
        let mtime = SystemTime::now() - Duration::from_secs(modified_secs_ago);
        write_file_at(dir, name, contents, mtime)
    }

    fn write_file_at(dir: &Path, name: &str, contents: &str, mtime: SystemTime) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
        path
    }

    #[test]
    fn two_phases_over_nine_hours_end_to_end() {
        let csv = timesheet(&[
            "101 Alpha,Dev,,2024-01-01,5",
            "101 Alpha,QA,,2024-01-01,4",
        ]);
        let table = build_report_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.dates.len(), 31);

        let rows = parse_output(&render_csv(&table).unwrap());
        let header = &rows[0];
        assert_eq!(header.len(), 4 + 31 + 1);
        assert_eq!(header[4], "2024-01-01");
        assert_eq!(header[35], "合計時間");

        let expected = [
            ["101", "Alpha", "Dev", "定時内", "4", "4"],
            ["101", "Alpha", "Dev", "定時外", "1", "1"],
            ["101", "Alpha", "QA", "定時内", "4", "4"],
            ["101", "Alpha", "QA", "定時外", "", "0"],
            ["", "", "", "定時内合計", "8", "8"],
            ["", "", "", "定時外合計", "1", "1"],
        ];
        assert_eq!(rows.len(), 1 + expected.len());
        for (row, exp) in rows[1..].iter().zip(expected.iter()) {
            assert_eq!(&row[..5], &exp[..5], "row {:?}", row);
            assert_eq!(row[35], exp[5], "row {:?}", row);
            assert!(row[5..35].iter().all(|c| c.is_empty()), "row {:?}", row);
        }
    }

    #[test]
    fn hours_are_conserved_per_project_phase_and_date() {
        let csv = timesheet(&[
            "101 Alpha,Dev,,2024-05-07,6",
            "101 Alpha,Dev,,2024-05-07,1.5",
            "101 Alpha,,休暇,2024-05-07,0.5",
            "202 Beta,Review,,2024-05-07,3",
            "202 Beta,Review,,2024-05-08,9",
        ]);
        let table = build_report_from_reader(csv.as_bytes()).unwrap();
        let may7 = table.date_index("2024-05-07".parse().unwrap()).unwrap();

        let hours = |phase: &str, category: ReportCategory, idx: usize| {
            table
                .rows
                .iter()
                .find(|r| r.phase == phase && r.category == category)
                .map(|r| r.hours[idx])
                .unwrap()
        };

        // 7.5 + 0.5 + 3 = 11h on May 7th: the 7.5h Dev entry takes the 3h of overtime.
        assert_eq!(hours("Dev", ReportCategory::Regular, may7), dec!(4.5));
        assert_eq!(hours("Dev", ReportCategory::Overtime, may7), dec!(3));
        assert_eq!(hours("休暇", ReportCategory::Regular, may7), dec!(0.5));
        assert_eq!(hours("Review", ReportCategory::Regular, may7), dec!(3));
        assert_eq!(hours("Review", ReportCategory::Overtime, may7), dec!(0));

        let regular = table.summary(ReportCategory::RegularTotal).unwrap();
        let overtime = table.summary(ReportCategory::OvertimeTotal).unwrap();
        assert_eq!(regular.total + overtime.total, dec!(20));
        assert_eq!(overtime.total, dec!(4));
        for row in &table.rows {
            assert!(row.hours.iter().all(|h| *h >= dec!(0)), "row {:?}", row);
        }
    }

    #[test]
    fn blank_hours_cell_does_not_refuse_the_report() {
        let csv = timesheet(&[
            "101 Alpha,Dev,,2024-01-01,",
            "101 Alpha,Dev,,2024-01-02,3",
        ]);
        let table = build_report_from_reader(csv.as_bytes()).unwrap();
        let regular = table.summary(ReportCategory::RegularTotal).unwrap();
        assert_eq!(regular.total, dec!(3));
    }

    #[test]
    fn oversized_hours_are_rejected_instead_of_overflowing() {
        let csv = timesheet(&[
            "101 Alpha,Dev,,2024-01-01,79228162514264337593543950335",
            "101 Alpha,QA,,2024-01-01,79228162514264337593543950335",
        ]);
        let err = build_report_from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ReportError::InvalidField { ref column, .. } if column == "時間"));
    }

    #[test]
    fn every_day_of_every_touched_month_is_a_column() {
        let csv = timesheet(&[
            "101 Alpha,Dev,,2024-01-31,2",
            "101 Alpha,Dev,,2024/03/01,2",
        ]);
        let table = build_report_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.dates.len(), 31 + 31);
        let header = table.header();
        assert!(header.contains(&"2024-01-01".to_string()));
        assert!(header.contains(&"2024-03-31".to_string()));
        assert!(!header.iter().any(|h| h.starts_with("2024-02")));
    }

    #[test]
    fn rendering_is_deterministic() {
        let csv = timesheet(&[
            "305 Gamma,Dev,,2024-02-02,7",
            "101 Alpha,QA,,2024-02-02,2",
            "101 Alpha,Dev,,2024-02-02,2",
            "Internal,,会議,2024-02-05,1",
        ]);
        let first = render_csv(&build_report_from_reader(csv.as_bytes()).unwrap()).unwrap();
        let second = render_csv(&build_report_from_reader(csv.as_bytes()).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn generate_report_writes_bom_csv_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_file(
            dir.path(),
            "timesheet.csv",
            &timesheet(&["101 Alpha,Dev,,2024-01-01,10"]),
            0,
        );
        let output = dir.path().join("report.csv");

        generate_report(&input, &output).unwrap();
        let first = fs::read(&output).unwrap();
        generate_report(&input, &output).unwrap();
        let second = fs::read(&output).unwrap();
        assert_eq!(first, second);

        let rows = parse_output(&first);
        assert_eq!(rows[1][3], "定時内");
        assert_eq!(rows[1][4], "8");
        assert_eq!(rows[2][4], "2");

        // Only the input and the report remain; no temporary file is left behind.
        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["report.csv", "timesheet.csv"]);
    }

    #[test]
    fn failed_run_leaves_existing_output_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_file(dir.path(), "empty.csv", HEADER, 0);
        let output = dir.path().join("report.csv");
        fs::write(&output, "previous report").unwrap();

        let err = generate_report(&input, &output).unwrap_err();
        assert!(matches!(err, ReportError::EmptyInput));
        assert_eq!(fs::read_to_string(&output).unwrap(), "previous report");
    }

    #[test]
    fn missing_column_aborts_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_file(dir.path(), "bad.csv", "プロジェクト,日付,時間\n101 A,2024-01-01,1\n", 0);
        let output = dir.path().join("report.csv");

        let err = generate_report(&input, &output).unwrap_err();
        assert!(matches!(err, ReportError::MissingColumn(ref c) if c == "工程"));
        assert!(!output.exists());
    }

    #[test]
    fn latest_csv_is_discovered_by_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "old.csv", HEADER, 300);
        let newest = write_file(dir.path(), "new.CSV", HEADER, 10);
        write_file(dir.path(), "notes.txt", "not a timesheet", 0);

        assert_eq!(find_latest_csv(dir.path()).unwrap(), newest);
        assert_eq!(resolve_input(None, dir.path()).unwrap(), newest);
    }

    #[test]
    fn equal_modification_times_pick_the_greater_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(60);
        write_file_at(dir.path(), "2024-04.csv", HEADER, mtime);
        let latest_name = write_file_at(dir.path(), "2024-05.csv", HEADER, mtime);
        write_file_at(dir.path(), "2024-03.csv", HEADER, mtime);

        for _ in 0..3 {
            assert_eq!(find_latest_csv(dir.path()).unwrap(), latest_name);
        }
    }

    #[test]
    fn discovery_fails_without_csv_files_or_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "notes.txt", "not a timesheet", 0);
        assert!(matches!(
            find_latest_csv(dir.path()),
            Err(ReportError::InputNotFound(_))
        ));

        let missing = dir.path().join("no-such-dir");
        assert!(matches!(
            resolve_input(None, &missing),
            Err(ReportError::InputNotFound(ref p)) if *p == missing
        ));
    }

    #[test]
    fn bare_input_name_is_resolved_inside_input_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "april.csv", HEADER, 0);

        assert_eq!(
            resolve_input(Some(Path::new("april.csv")), dir.path()).unwrap(),
            path
        );
        // A path with a directory part is taken as-is.
        assert_eq!(resolve_input(Some(path.as_path()), Path::new("redmine")).unwrap(), path);
        assert!(matches!(
            resolve_input(Some(Path::new("may.csv")), dir.path()),
            Err(ReportError::InputNotFound(_))
        ));
    }
}
