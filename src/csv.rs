use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::{Balance, ExchangedPrize, Prize, Request, UserId};

/// Errors that can occur when reading or writing csv files
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("cannot open {}: {source}", path.display())]
    Open { path: PathBuf, source: csv::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized request type '{kind}'")]
    UnrecognizedType { line: usize, kind: String },

    #[error("line {line}: {kind} missing argument")]
    MissingArgument { line: usize, kind: String },

    #[error("failed to write csv row: {0}")]
    Write(#[from] csv::Error),

    #[error("failed to flush csv output: {0}")]
    Flush(#[from] io::Error),
}

#[derive(Debug, Deserialize)]
struct RequestRow {
    r#type: String,
    user: UserId,
    arg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PrizeRow {
    name: String,
    cost: u64,
}

#[derive(Debug, Deserialize)]
struct TokenRow {
    token: String,
}

#[derive(Debug, Serialize)]
struct BalanceRow<'a> {
    user: &'a str,
    points: u64,
    coins: u64,
}

#[derive(Debug, Serialize)]
struct RedemptionRow<'a> {
    user: &'a str,
    prize: &'a str,
    code: &'a str,
}

fn open(path: &Path) -> Result<csv::Reader<File>, CsvError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|source| CsvError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Deserialize every row, tagging failures with their line number.
fn rows<T>(reader: csv::Reader<File>) -> impl Iterator<Item = Result<T, CsvError>>
where
    T: for<'de> Deserialize<'de>,
{
    reader
        .into_deserialize::<T>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            result.map_err(|source| CsvError::Parse { line, source })
        })
}

/// Read requests (`type,user,arg`) from a csv file
pub fn read_requests(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<Request, CsvError>>, CsvError> {
    let rows = rows::<RequestRow>(open(path.as_ref())?);

    Ok(rows.enumerate().map(|(idx, result)| {
        let line = idx + 2;
        let row = result?;
        let arg = row.arg.filter(|arg| !arg.is_empty());
        let missing = |kind: &str| CsvError::MissingArgument {
            line,
            kind: kind.to_string(),
        };
        match row.r#type.as_str() {
            "draw" => Ok(Request::Draw { user: row.user }),
            "ticket_draw" => Ok(Request::TicketDraw {
                user: row.user,
                ticket: arg.ok_or_else(|| missing("ticket_draw"))?,
            }),
            "convert" => Ok(Request::ConvertCoins { user: row.user }),
            "exchange" => Ok(Request::ExchangePrize {
                user: row.user,
                prize: arg.ok_or_else(|| missing("exchange"))?,
            }),
            other => Err(CsvError::UnrecognizedType {
                line,
                kind: other.to_string(),
            }),
        }
    }))
}

/// Read prizes (`name,cost`) from a csv file
pub fn read_prizes(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<Prize, CsvError>>, CsvError> {
    let rows = rows::<PrizeRow>(open(path.as_ref())?);
    Ok(rows.map(|result| result.map(|row| Prize::new(row.name, row.cost))))
}

/// Read single-use tokens (`token`) from a csv file
pub fn read_tokens(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<String, CsvError>>, CsvError> {
    let rows = rows::<TokenRow>(open(path.as_ref())?);
    Ok(rows.map(|result| result.map(|row| row.token)))
}

/// Write balances in csv format
pub fn write_balances<'a>(
    out: impl io::Write,
    balances: impl IntoIterator<Item = &'a Balance>,
) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(out);

    for balance in balances {
        writer.serialize(BalanceRow {
            user: &balance.user_id,
            points: balance.points.value(),
            coins: balance.coins.value(),
        })?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the redemption ledger in csv format
pub fn write_redemptions<'a>(
    out: impl io::Write,
    records: impl IntoIterator<Item = &'a ExchangedPrize>,
) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(out);

    for record in records {
        writer.serialize(RedemptionRow {
            user: &record.user_id,
            prize: &record.prize_name,
            code: &record.code,
        })?;
    }

    writer.flush()?;
    Ok(())
}
