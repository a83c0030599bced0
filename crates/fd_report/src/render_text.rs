// crates/fd_report/src/render_text.rs
//
// Plain-text report for terminals and logs. Column widths are computed from
// the model so the output is stable for a given result.

use std::fmt::Write as _;

use crate::ReportModel;

fn mark(pass: bool) -> &'static str {
    if pass { "yes" } else { "no" }
}

pub fn render_text(m: &ReportModel) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(m, &mut out);
    out
}

fn write_report(m: &ReportModel, out: &mut String) -> std::fmt::Result {
    let s = &m.summary;
    writeln!(
        out,
        "{} ({}), {} players: {}, score {}",
        s.algorithm_name,
        s.algorithm,
        s.player_count,
        s.verdict.label(),
        s.score_pct_1dp
    )?;

    // Allocation
    writeln!(out)?;
    writeln!(out, "Allocation")?;
    let pw = m.allocation.rows.iter().map(|r| r.player.len()).max().unwrap_or(0).max("player".len());
    let sw = m.allocation.rows.iter().map(|r| r.share.len()).max().unwrap_or(0).max("share".len());
    writeln!(out, "  {:<pw$}  {:<sw$}  {:>8}  {}", "player", "share", "value", "fair share")?;
    for r in &m.allocation.rows {
        writeln!(
            out,
            "  {:<pw$}  {:<sw$}  {:>8}  {}",
            r.player,
            r.share,
            r.own_value_1dp,
            mark(r.proportional)
        )?;
    }
    if let Some(l) = &m.allocation.leftover {
        writeln!(out, "  leftover: {l}")?;
    }

    // Properties
    writeln!(out)?;
    writeln!(out, "Properties")?;
    let nw = m.properties.iter().map(|p| p.name.len()).max().unwrap_or(0);
    for p in &m.properties {
        writeln!(out, "  {:<nw$}  {:<3}  {}", p.name, mark(p.pass), p.detail)?;
    }

    // Envy matrix; `!` marks a share the evaluator prefers to their own.
    writeln!(out)?;
    writeln!(out, "Envy matrix (row values column's share)")?;
    let cw = m
        .envy
        .rows
        .iter()
        .flat_map(|r| r.cells.iter().map(|c| c.value_1dp.len() + 1))
        .chain(m.envy.players.iter().map(|p| p.len()))
        .max()
        .unwrap_or(0);
    let ew = m.envy.players.iter().map(|p| p.len()).max().unwrap_or(0);
    write!(out, "  {:<ew$}", "")?;
    for p in &m.envy.players {
        write!(out, "  {p:>cw$}")?;
    }
    writeln!(out)?;
    for r in &m.envy.rows {
        write!(out, "  {:<ew$}", r.evaluator)?;
        for c in &r.cells {
            let cell = if c.envies { format!("{}!", c.value_1dp) } else { c.value_1dp.clone() };
            write!(out, "  {cell:>cw$}")?;
        }
        writeln!(out)?;
    }

    writeln!(out)?;
    let i = &m.integrity;
    writeln!(out, "result {}", i.result_id)?;
    writeln!(out, "run {} .. {}, {} steps", i.started_at, i.finished_at, i.steps_entered)?;
    Ok(())
}
