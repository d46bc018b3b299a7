//! Price file ingestion.
//!
//! Every column is read as text, headers are lower-cased, and the table is
//! validated against the raw price schema before any value is touched. Rows
//! whose timestamp or numeric fields fail to parse are dropped, never
//! imputed. The surviving rows are sorted by timestamp and de-duplicated
//! (first occurrence wins).

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{debug, warn};

use super::provider::{clip_to_range, DataError, DataSource, FetchError, FetchResult, PriceProvider};
use super::schema::PriceSchema;
use crate::domain::{parse_timestamp, Bar};

/// Counts from one ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub duplicates_dropped: usize,
}

/// Read a price CSV into validated, time-ordered bars.
pub fn read_price_csv(path: &Path) -> Result<Vec<Bar>, DataError> {
    let (bars, report) = read_price_csv_with_report(path)?;
    if report.rows_dropped > 0 || report.duplicates_dropped > 0 {
        warn!(
            path = %path.display(),
            dropped = report.rows_dropped,
            duplicates = report.duplicates_dropped,
            "dropped unusable price rows"
        );
    }
    Ok(bars)
}

/// Like [`read_price_csv`], also returning row counts.
pub fn read_price_csv_with_report(path: &Path) -> Result<(Vec<Bar>, IngestReport), DataError> {
    if !path.exists() {
        return Err(DataError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "price file not found"),
        ));
    }

    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()
        .and_then(|lf| lf.collect())
        .map_err(|e| DataError::Csv(format!("{}: {e}", path.display())))?;

    let (bars, report) = frame_to_bars(df)?;
    if bars.is_empty() {
        return Err(DataError::NoData(path.display().to_string()));
    }
    debug!(path = %path.display(), rows = bars.len(), "ingested price file");
    Ok((bars, report))
}

/// Convert a text-typed price table into bars.
///
/// Column names are matched case-insensitively. A missing required column is
/// a hard error naming the column. Rows that fail [`Bar::is_sane`] are dropped
/// and counted in `rows_dropped`.
pub fn frame_to_bars(mut df: DataFrame) -> Result<(Vec<Bar>, IngestReport), DataError> {
    let lowered: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|c| c.trim().to_lowercase())
        .collect();
    df.set_column_names(lowered.iter().map(|s| s.as_str()))
        .map_err(|e| DataError::Csv(format!("rename columns: {e}")))?;

    let columns = PriceSchema::validate_raw(&df)?;
    let n = df.height();

    let timestamps = text_column(&df, &columns.timestamp)?;
    let open = numeric_column(&df, "open")?;
    let high = numeric_column(&df, "high")?;
    let low = numeric_column(&df, "low")?;
    let close = numeric_column(&df, "close")?;
    let volume = numeric_column(&df, "volume")?;

    let mut bars = Vec::with_capacity(n);
    for i in 0..n {
        let Some(timestamp) = timestamps[i].as_deref().and_then(parse_timestamp) else {
            continue;
        };
        let (Some(o), Some(h), Some(l), Some(c), Some(v)) =
            (open[i], high[i], low[i], close[i], volume[i])
        else {
            continue;
        };
        let bar = Bar {
            timestamp,
            open: o,
            high: h,
            low: l,
            close: c,
            volume: v,
        };
        // non-finite fields, inverted ranges, non-positive close, negative volume
        if !bar.is_sane() {
            continue;
        }
        bars.push(bar);
    }

    let parsed = bars.len();
    let bars = sort_dedup(bars);
    let report = IngestReport {
        rows_read: n,
        rows_dropped: n - parsed,
        duplicates_dropped: parsed - bars.len(),
    };
    Ok((bars, report))
}

/// Sort by timestamp, keeping the first row seen for each timestamp.
pub fn sort_dedup(mut bars: Vec<Bar>) -> Vec<Bar> {
    // stable sort keeps file order within equal timestamps
    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);
    bars
}

fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, DataError> {
    let col = df
        .column(name)
        .map_err(|_| DataError::MissingColumn(name.to_string()))?
        .cast(&DataType::String)
        .map_err(|e| DataError::Csv(format!("{name}: {e}")))?;
    let ca = col
        .str()
        .map_err(|e| DataError::Csv(format!("{name}: {e}")))?;
    Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, DataError> {
    let texts = text_column(df, name)?;
    Ok(texts
        .into_iter()
        .map(|v| {
            v.and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|x| x.is_finite())
        })
        .collect())
}

/// Provider backed by one CSV file per symbol: `{dir}/{SYMBOL}.csv`.
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

impl PriceProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, FetchError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(FetchError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let bars = clip_to_range(read_price_csv(&path)?, start, end);
        if bars.is_empty() {
            return Err(FetchError::Empty {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::CsvImport,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_sorts_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "p.csv",
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-03,2,3,1,2.5,10\n\
             2024-01-02,1,2,0.5,1.5,10\n\
             2024-01-03,9,9,9,9,9\n",
        );
        let (bars, report) = read_price_csv_with_report(&path).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 1.5);
        assert_eq!(bars[1].close, 2.5);
        assert_eq!(report.duplicates_dropped, 1);
    }

    #[test]
    fn drops_rows_with_bad_numbers_or_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "p.csv",
            "datetime,open,high,low,close,volume\n\
             2024-01-02 00:00:00,1,2,0.5,1.5,10\n\
             garbage,1,2,0.5,1.5,10\n\
             2024-01-04 00:00:00,1,2,n/a,1.5,10\n\
             2024-01-05 00:00:00,1,2,0.5,,10\n\
             2024-01-08 00:00:00,1,2,0.5,1.7,10\n",
        );
        let (bars, report) = read_price_csv_with_report(&path).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(report.rows_read, 5);
        assert_eq!(report.rows_dropped, 3);
        assert_eq!(bars[1].close, 1.7);
    }

    #[test]
    fn drops_bars_with_impossible_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "p.csv",
            "date,open,high,low,close,volume\n\
             2024-01-02,10,11,9,10,-500\n\
             2024-01-03,10,9,11,10,100\n\
             2024-01-04,10,11,9,10.5,100\n\
             2024-01-05,10,10.2,9,10.5,100\n",
        );
        let (bars, report) = read_price_csv_with_report(&path).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(report.rows_dropped, 3);
        assert_eq!(bars[0].close, 10.5);
        assert!(bars.iter().all(Bar::is_sane));
    }

    #[test]
    fn missing_column_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "p.csv",
            "date,open,high,low,volume\n2024-01-02,1,2,0.5,10\n",
        );
        match read_price_csv(&path) {
            Err(DataError::MissingColumn(c)) => assert_eq!(c, "close"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn file_with_no_usable_rows_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "p.csv",
            "date,open,high,low,close,volume\nbad,x,x,x,x,x\n",
        );
        assert!(matches!(read_price_csv(&path), Err(DataError::NoData(_))));
    }

    #[test]
    fn csv_provider_clips_range_and_reports_missing_symbol() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(
            dir.path(),
            "AAA.csv",
            "date,open,high,low,close,volume\n\
             2024-01-02,1,2,0.5,1.5,10\n\
             2024-01-03,1,2,0.5,1.6,10\n\
             2024-01-04,1,2,0.5,1.7,10\n",
        );
        let provider = CsvProvider::new(dir.path());
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();

        let fetched = provider.fetch("AAA", d(3), d(4)).unwrap();
        assert_eq!(fetched.bars.len(), 2);
        assert_eq!(fetched.source, DataSource::CsvImport);

        assert!(matches!(
            provider.fetch("BBB", d(1), d(9)),
            Err(FetchError::SymbolNotFound { .. })
        ));
        assert!(matches!(
            provider.fetch("AAA", d(20), d(25)),
            Err(FetchError::Empty { .. })
        ));
    }
}
