//! Parliament open-data feed format and normalization into vote records

use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use time::Date;
use time::macros::format_description;
use vote_herald_domain::{
    DEFAULT_AUTHOR, SourceError, VoteBreakdown, VoteDetail, VoteRecord, VoteResult,
};

/// Marker the feed uses for a vote without a party breakdown
const UNANIMOUS_MARKER: &str = "unanime";

/// The feed emits a bare object where a one-element list is expected
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

fn list_wrap<T>(raw: Option<OneOrMany<T>>) -> Vec<T> {
    raw.map(OneOrMany::into_vec).unwrap_or_default()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawInitiative {
    #[serde(rename = "IniNr", default)]
    number: Option<RawId>,
    #[serde(rename = "IniTitulo", default)]
    title: Option<String>,
    #[serde(rename = "IniDescTipo", default)]
    type_description: Option<String>,
    #[serde(rename = "IniLinkTexto", default)]
    link: Option<String>,
    #[serde(rename = "IniAutorGruposParlamentares", default)]
    author_groups: Option<OneOrMany<RawAuthorGroup>>,
    #[serde(rename = "IniEventos", default)]
    events: Option<OneOrMany<RawEvent>>,
}

#[derive(Debug, Deserialize)]
struct RawAuthorGroup {
    #[serde(rename = "GP")]
    group: String,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "Fase", default)]
    phase: Option<String>,
    #[serde(rename = "Votacao", default)]
    votes: Option<OneOrMany<RawVote>>,
}

#[derive(Debug, Deserialize)]
struct RawVote {
    #[serde(default)]
    id: Option<RawId>,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    resultado: Option<String>,
    #[serde(default)]
    detalhe: Option<String>,
    #[serde(default)]
    unanime: Option<String>,
}

/// Parser for the initiatives export of a legislature
pub struct FeedParser {
    section_separator: Regex,
}

impl FeedParser {
    pub fn new() -> Self {
        Self {
            section_separator: Regex::new(r"(?i)<br\s*/?>").expect("Valid regex"),
        }
    }

    /// Parse the raw export body into a flat list of votes, in feed order
    pub fn parse(&self, body: &str) -> Result<Vec<VoteRecord>, SourceError> {
        let body = body.trim_start_matches('\u{feff}');
        let initiatives: OneOrMany<RawInitiative> = serde_json::from_str(body)
            .map_err(|e| SourceError::Malformed(format!("Invalid initiatives JSON: {}", e)))?;

        let mut votes = Vec::new();
        for initiative in initiatives.into_vec() {
            self.parse_initiative(initiative, &mut votes)?;
        }

        Ok(votes)
    }

    fn parse_initiative(
        &self,
        initiative: RawInitiative,
        votes: &mut Vec<VoteRecord>,
    ) -> Result<(), SourceError> {
        let events = list_wrap(initiative.events);
        if events.iter().all(|event| event.votes.is_none()) {
            return Ok(());
        }

        let context = initiative
            .number
            .map(RawId::into_string)
            .unwrap_or_else(|| "?".to_string());
        let title = required(initiative.title, "IniTitulo", &context)?;
        let initiative_type = required(initiative.type_description, "IniDescTipo", &context)?;
        let uri = required(initiative.link, "IniLinkTexto", &context)?;
        let authors = parse_authorship(initiative.author_groups);

        for event in events {
            let raw_votes = list_wrap(event.votes);
            if raw_votes.is_empty() {
                continue;
            }

            let phase = required(event.phase, "Fase", &context)?;

            for raw_vote in raw_votes {
                let id = required(raw_vote.id.map(RawId::into_string), "id", &context)?;
                let raw_date = required(raw_vote.data, "data", &id)?;
                let result = required(raw_vote.resultado, "resultado", &id)?;

                votes.push(VoteRecord {
                    date: self.parse_date(&raw_date, &id)?,
                    result: VoteResult::from_label(result.trim()),
                    detail: self.parse_detail(raw_vote.detalhe, raw_vote.unanime, &id)?,
                    title: title.clone(),
                    initiative_type: initiative_type.clone(),
                    authors: authors.clone(),
                    phase: phase.clone(),
                    uri: uri.clone(),
                    id,
                });
            }
        }

        Ok(())
    }

    fn parse_date(&self, raw: &str, vote_id: &str) -> Result<Date, SourceError> {
        let raw = raw.trim();
        let day = raw.get(..10).unwrap_or(raw);
        Date::parse(day, format_description!("[year]-[month]-[day]")).map_err(|e| {
            SourceError::Malformed(format!("vote {}: invalid date '{}': {}", vote_id, raw, e))
        })
    }

    /// Parse the vote breakdown.
    ///
    /// The detail reads like `A Favor: <I>PS</I>, <I>L</I><BR>Contra: <I>CH</I>`;
    /// unanimous votes carry no breakdown, only the marker.
    pub fn parse_detail(
        &self,
        detail: Option<String>,
        unanimous: Option<String>,
        vote_id: &str,
    ) -> Result<VoteDetail, SourceError> {
        let raw = detail
            .filter(|d| !d.trim().is_empty())
            .or(unanimous)
            .ok_or_else(|| {
                SourceError::Malformed(format!("vote {}: missing detalhe", vote_id))
            })?;

        if raw.trim() == UNANIMOUS_MARKER {
            return Ok(VoteDetail::Unanimous);
        }

        let mut breakdown = VoteBreakdown::default();
        for section in self.section_separator.split(&raw) {
            let section = plain_text(section);
            let Some((label, names)) = section.split_once(':') else {
                continue;
            };

            let names = parse_names(names);
            match label.trim() {
                "A Favor" => breakdown.in_favour = names,
                "Contra" => breakdown.against = names,
                "Abstenção" => breakdown.abstained = names,
                "Ausência" => breakdown.absent = names,
                other => {
                    tracing::debug!(vote_id = %vote_id, label = %other, "Ignoring unknown vote section");
                }
            }
        }

        Ok(VoteDetail::Breakdown(breakdown))
    }

}

/// Text content of an HTML fragment, tags dropped and entities decoded
fn plain_text(fragment: &str) -> String {
    Html::parse_fragment(fragment)
        .root_element()
        .text()
        .collect()
}

fn parse_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_authorship(raw: Option<OneOrMany<RawAuthorGroup>>) -> Vec<String> {
    let authors: Vec<String> = list_wrap(raw).into_iter().map(|a| a.group).collect();
    if authors.is_empty() {
        vec![DEFAULT_AUTHOR.to_string()]
    } else {
        authors
    }
}

fn required(value: Option<String>, field: &str, context: &str) -> Result<String, SourceError> {
    value.filter(|v| !v.trim().is_empty()).ok_or_else(|| {
        SourceError::Malformed(format!("{}: missing required field {}", context, field))
    })
}
