use super::*;

pub(super) fn write_text_report<W: Write>(output: &mut W, report: &AnalyticsReport) -> Result<()> {
    writeln!(
        output,
        "Settings: policy={} target_raters={} granularity={} seed={}",
        report.settings.policy,
        report.settings.target_raters,
        report.settings.granularity,
        report.settings.seed,
    )?;
    writeln!(
        output,
        "Snapshot: submissions={} ratings={}",
        report.submissions, report.ratings
    )?;

    writeln!(output)?;
    writeln!(output, "Agreement: {}", report.agreement.len())?;
    if report.agreement.is_empty() {
        writeln!(output, "  no data")?;
    }
    for record in &report.agreement {
        writeln!(
            output,
            "  {} / {}: kappa={:.3} ({}, {}) preference_strength={} subjects={} roster={}",
            record.questionnaire_id,
            record.dimension_id,
            record.fleiss_kappa,
            record.kappa_interpretation.as_str(),
            record.agreement_label.as_str(),
            record.preference_strength,
            record.subject_count,
            record.roster.join(","),
        )?;
        let stats = &record.reconciliation;
        if record.synthetic {
            writeln!(
                output,
                "    synthetic: cloned_raters={} cloned_judgments={} filled_judgments={}",
                stats.synthetic_raters.len(),
                stats.cloned_judgments,
                stats.filled_judgments,
            )?;
        }
        if !stats.sampled_out_raters.is_empty() || stats.dropped_subjects > 0 {
            writeln!(
                output,
                "    reduced: sampled_out={} dropped_subjects={}",
                stats.sampled_out_raters.join(","),
                stats.dropped_subjects,
            )?;
        }
    }
    for skipped in &report.skipped {
        writeln!(
            output,
            "  skipped {} / {}: {}",
            skipped.key.questionnaire_id, skipped.key.dimension_id, skipped.reason
        )?;
    }

    writeln!(output)?;
    writeln!(output, "Dimensions: {}", report.dimensions.len())?;
    for dimension in &report.dimensions {
        let pct = &dimension.winner_percentages;
        let keywords = dimension
            .notes
            .keywords
            .iter()
            .map(|keyword| format!("{}({})", keyword.word, keyword.count))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(
            output,
            "  {}: evaluations={} A={}% B={}% tie={}% empty={}% notes={} avg_note_len={:.1} keywords=[{}]",
            dimension.dimension_id,
            dimension.evaluations,
            pct.a,
            pct.b,
            pct.tie,
            pct.empty,
            dimension.notes.notes_count,
            dimension.notes.average_length,
            keywords,
        )?;
    }

    let matrix = &report.dimension_agreement;
    if matrix.dimensions.len() > 1 {
        writeln!(output)?;
        writeln!(output, "Dimension agreement rate:")?;
        for (row, left) in matrix.dimensions.iter().enumerate() {
            for (column, right) in matrix.dimensions.iter().enumerate().skip(row + 1) {
                writeln!(
                    output,
                    "  {} ~ {}: {:.2} over {} submission(s)",
                    left, right, matrix.rates[row][column], matrix.co_evaluated[row][column],
                )?;
            }
        }
    }

    Ok(())
}
