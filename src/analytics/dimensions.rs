use super::*;

const KEYWORD_LIMIT: usize = 5;
const KEYWORD_MIN_CHARS: usize = 4;

static WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("valid word regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WinnerCounts {
    #[serde(rename = "A")]
    pub a: usize,
    #[serde(rename = "B")]
    pub b: usize,
    pub tie: usize,
    pub empty: usize,
}

impl WinnerCounts {
    pub fn total(&self) -> usize {
        self.a + self.b + self.tie + self.empty
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WinnerPercentages {
    #[serde(rename = "A")]
    pub a: u32,
    #[serde(rename = "B")]
    pub b: u32,
    pub tie: u32,
    pub empty: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordCount {
    pub word: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSummary {
    pub notes_count: usize,
    pub average_length: f64,
    pub keywords: Vec<KeywordCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionAnalysis {
    pub dimension_id: String,
    pub evaluations: usize,
    pub winner_counts: WinnerCounts,
    pub winner_percentages: WinnerPercentages,
    pub notes: NoteSummary,
}

/// Tallies one dimension across every submission that evaluated it. Unlike the
/// kappa path this counts blank or unrecognized winners, as `empty`.
pub fn analyze_dimension(dimension_id: &str, submissions: &[Submission]) -> DimensionAnalysis {
    let mut counts = WinnerCounts::default();
    let mut notes = Vec::<&str>::new();

    for evaluation in submissions
        .iter()
        .filter_map(|submission| submission.evaluation(dimension_id))
    {
        match evaluation.parsed_winner() {
            Some(Winner::A) => counts.a += 1,
            Some(Winner::B) => counts.b += 1,
            Some(Winner::Tie) => counts.tie += 1,
            None => counts.empty += 1,
        }
        if let Some(note) = evaluation
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|note| !note.is_empty())
        {
            notes.push(note);
        }
    }

    let total = counts.total();
    DimensionAnalysis {
        dimension_id: dimension_id.to_string(),
        evaluations: total,
        winner_counts: counts,
        winner_percentages: WinnerPercentages {
            a: percentage(counts.a, total),
            b: percentage(counts.b, total),
            tie: percentage(counts.tie, total),
            empty: percentage(counts.empty, total),
        },
        notes: summarize_notes(&notes),
    }
}

pub fn analyze_dimensions(
    dimension_ids: &[String],
    submissions: &[Submission],
) -> Vec<DimensionAnalysis> {
    dimension_ids
        .iter()
        .map(|dimension_id| analyze_dimension(dimension_id, submissions))
        .collect()
}

/// Every dimension id mentioned by any submission, sorted.
pub fn dimension_ids(submissions: &[Submission]) -> Vec<String> {
    submissions
        .iter()
        .flat_map(|submission| submission.dimension_evaluations.iter())
        .map(|evaluation| evaluation.dimension_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn percentage(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (count as f64 * 100.0 / total as f64).round() as u32
}

fn summarize_notes(notes: &[&str]) -> NoteSummary {
    if notes.is_empty() {
        return NoteSummary::default();
    }

    let total_chars = notes.iter().map(|note| note.chars().count()).sum::<usize>();
    let mut frequencies = HashMap::<String, usize>::new();
    for note in notes {
        for word in WORD_REGEX.find_iter(note) {
            let word = word.as_str().to_lowercase();
            if word.chars().count() >= KEYWORD_MIN_CHARS {
                *frequencies.entry(word).or_default() += 1;
            }
        }
    }

    let mut keywords = frequencies
        .into_iter()
        .map(|(word, count)| KeywordCount { word, count })
        .collect::<Vec<_>>();
    keywords.sort_by(|left, right| {
        right
            .count
            .cmp(&left.count)
            .then_with(|| left.word.cmp(&right.word))
    });
    keywords.truncate(KEYWORD_LIMIT);

    NoteSummary {
        notes_count: notes.len(),
        average_length: total_chars as f64 / notes.len() as f64,
        keywords,
    }
}
