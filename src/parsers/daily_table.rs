use chrono::NaiveDate;
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};

use crate::error::{Result, ScrapeError};
use crate::models::{DailyTemps, TempBatch, TempValue};
use crate::utils::constants::{
    LAST_PAGE_MARKER, MISSING_MARKER, ROW_DATE_FORMAT, SUMMARY_MARKER,
};

/// Everything extracted from one month's page.
#[derive(Debug, Default)]
pub struct ParsedPage {
    /// Fully-populated data rows, keyed by calendar day.
    pub temps: TempBatch,
    /// True when the page carries the disabled "previous" pagination
    /// control, i.e. no older page exists.
    pub last_page: bool,
}

/// Parse a single month's daily-data page.
///
/// Runs the markup through the HTML tokenizer in one pass and extracts
/// every fully-populated data row plus the end-of-series flag. Returns a
/// format error if a row's date attribute is missing or unparseable; that
/// means the source layout changed and nothing from the page can be
/// trusted.
pub fn parse_daily_table(html: &str) -> Result<ParsedPage> {
    let mut input = BufferQueue::new();
    input.push_back(StrTendril::from(html));

    let mut tokenizer = Tokenizer::new(DailyTableSink::default(), TokenizerOpts::default());
    let _ = tokenizer.feed(&mut input);
    tokenizer.end();

    let sink = tokenizer.sink;
    if let Some(err) = sink.error {
        return Err(err);
    }

    Ok(ParsedPage {
        temps: sink.temps,
        last_page: sink.last_page,
    })
}

/// Where the cursor sits relative to the daily table.
///
/// `InCell` is only reachable through `InRow`, and `InRow` only through
/// `InBody`, so a cell is never counted outside an open row and a row is
/// never read outside the table body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableState {
    OutsideBody,
    InBody,
    InRow,
    InCell,
}

/// Per-row scratch space. Discarded at every row boundary so cell counts
/// and partial readings cannot leak into the next row.
#[derive(Debug, Default)]
struct RowAccumulator {
    date: Option<NaiveDate>,
    cells_seen: u8,
    max: Option<TempValue>,
    min: Option<TempValue>,
    mean: Option<TempValue>,
}

struct DailyTableSink {
    state: TableState,
    row: RowAccumulator,
    temps: TempBatch,
    last_page: bool,
    error: Option<ScrapeError>,
}

impl Default for DailyTableSink {
    fn default() -> Self {
        Self {
            state: TableState::OutsideBody,
            row: RowAccumulator::default(),
            temps: TempBatch::new(),
            last_page: false,
            error: None,
        }
    }
}

impl TokenSink for DailyTableSink {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        if self.error.is_some() {
            return TokenSinkResult::Continue;
        }

        match token {
            Token::TagToken(tag) => match tag.kind {
                TagKind::StartTag => self.handle_start_tag(&tag),
                TagKind::EndTag => self.handle_end_tag(&tag),
            },
            Token::CharacterTokens(text) => self.handle_text(&text),
            _ => {}
        }

        TokenSinkResult::Continue
    }
}

impl DailyTableSink {
    fn handle_start_tag(&mut self, tag: &Tag) {
        // The disabled "previous" control identifies the oldest page. It is
        // a page-level signal and can sit on any element, including on pages
        // with no data rows at all.
        if tag.attrs.len() == 2 && &*tag.attrs[1].value == LAST_PAGE_MARKER {
            self.last_page = true;
        }

        match &*tag.name {
            "tbody" => {
                if self.state == TableState::OutsideBody {
                    self.state = TableState::InBody;
                }
            }
            "tr" => {
                if self.state == TableState::InBody {
                    self.state = TableState::InRow;
                    self.row = RowAccumulator::default();
                }
            }
            "td" => {
                if self.state == TableState::InRow {
                    self.state = TableState::InCell;
                    self.row.cells_seen += 1;
                }
            }
            "abbr" => {
                if matches!(self.state, TableState::InRow | TableState::InCell) {
                    self.capture_row_date(tag);
                }
            }
            _ => {}
        }
    }

    fn handle_end_tag(&mut self, tag: &Tag) {
        match &*tag.name {
            "td" => {
                if self.state == TableState::InCell {
                    self.state = TableState::InRow;
                }
            }
            "tr" => {
                if matches!(self.state, TableState::InRow | TableState::InCell) {
                    self.state = TableState::InBody;
                    self.row = RowAccumulator::default();
                }
            }
            _ => {}
        }
    }

    fn handle_text(&mut self, text: &str) {
        let trimmed = text.trim();

        // Summary rows share markup with data rows; once the summary
        // section starts, nothing further on the page is a data row.
        if trimmed == SUMMARY_MARKER {
            self.state = TableState::OutsideBody;
            return;
        }

        if self.state != TableState::InCell || trimmed.is_empty() {
            return;
        }

        // Fixed column order of the source table: max, min, mean.
        match self.row.cells_seen {
            1 => self.row.max = Some(TempValue::from_raw(trimmed)),
            2 => self.row.min = Some(TempValue::from_raw(trimmed)),
            3 => {
                self.row.mean = Some(TempValue::from_raw(trimmed));
                self.commit_row();
            }
            _ => {}
        }
    }

    /// A row's date travels in the first attribute of its abbreviation
    /// element as a human-readable full date, e.g. "October 19, 1996".
    /// Failure to parse it is fatal for the whole page.
    fn capture_row_date(&mut self, tag: &Tag) {
        let Some(attr) = tag.attrs.first() else {
            self.error = Some(ScrapeError::Format(
                "row date element carries no attributes".to_string(),
            ));
            return;
        };

        match NaiveDate::parse_from_str(attr.value.trim(), ROW_DATE_FORMAT) {
            Ok(date) => self.row.date = Some(date),
            Err(e) => {
                self.error = Some(ScrapeError::Format(format!(
                    "unparseable row date {:?}: {}",
                    &*attr.value, e
                )));
            }
        }
    }

    /// All three temperature columns seen: bind an independent value to the
    /// row's date. Rows that never reach their third cell are dropped.
    fn commit_row(&mut self) {
        let Some(date) = self.row.date else {
            self.error = Some(ScrapeError::Format(
                "data row committed without a date cell".to_string(),
            ));
            return;
        };

        let missing = || TempValue::Missing(MISSING_MARKER.to_string());
        let temps = DailyTemps::new(
            self.row.max.clone().unwrap_or_else(missing),
            self.row.min.clone().unwrap_or_else(missing),
            self.row.mean.clone().unwrap_or_else(missing),
        );
        self.temps.insert(date, temps);
    }
}
