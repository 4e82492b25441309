use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Sparkline, Wrap};

use crate::app::{App, PaneFocus, format_hashes, format_hashrate, format_power, format_price_delta};
use crate::discovery::{Phase, block_chance};
use crate::ledger::{Roi, daily_cost_fiat};
use crate::sim::BlockRecord;
use crate::strategy::{HalvingPolicy, ProfitSnapshot};

pub fn draw(f: &mut Frame<'_>, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(6)])
        .split(f.size());

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(main_chunks[0]);

    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(main_chunks[1]);

    draw_mining(f, left_chunks[0], app);
    draw_strategy(f, left_chunks[1], app);
    draw_fleet(f, right_chunks[0], app);
    draw_blocks(f, right_chunks[1], app);

    let footer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3)])
        .split(chunks[1]);

    draw_ticker(f, footer[0], app);
    draw_footer(f, footer[1], app);
}

fn draw_mining(f: &mut Frame<'_>, area: Rect, app: &App) {
    let block = pane_block("Mining", app.focus == PaneFocus::Mining);
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let discovery = app.sim.discovery();
    if !discovery.is_engaged() {
        let placeholder =
            Paragraph::new("Rig idle. Press Enter to start searching for a block.")
                .wrap(Wrap { trim: true });
        f.render_widget(placeholder, inner);
        return;
    }

    let segments = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(inner);

    let ratio = (discovery.progress() / 100.0).clamp(0.0, 1.0);
    let gauge = Gauge::default()
        .block(Block::default().title(discovery.header().id.clone()))
        .ratio(ratio)
        .gauge_style(
            Style::default()
                .fg(Color::Green)
                .bg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .label(format!("{:.0}%", discovery.progress()));
    f.render_widget(gauge, segments[0]);

    let profile = app.sim.fleet().aggregate();
    let level = app
        .sim
        .schedule()
        .difficulty_level(app.sim.clock().tick());
    let chance = block_chance(profile.hashrate, level);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Status ", Style::default().fg(Color::Gray)),
            Span::raw(match discovery.phase() {
                Phase::Mining => "searching".to_string(),
                Phase::Found { .. } => "block found — resetting".to_string(),
                Phase::Idle => "idle".to_string(),
            }),
            Span::raw("  |  Difficulty "),
            Span::styled(format!("L{}", level), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            Span::styled("Hashrate ", Style::default().fg(Color::Gray)),
            Span::styled(
                format_hashrate(profile.hashrate),
                Style::default().fg(Color::LightGreen),
            ),
            Span::raw("  |  Nonces "),
            Span::styled(
                format_hashes(discovery.nonce()),
                Style::default().fg(Color::LightCyan),
            ),
        ]),
        Line::from(vec![
            Span::styled("Chance ", Style::default().fg(Color::Gray)),
            Span::raw(format!("{:.2}% per step", chance * 100.0)),
            Span::raw("  |  Reward "),
            Span::styled(
                format!(
                    "{:.4} ⛏",
                    app.sim.schedule().block_reward(app.sim.clock().tick())
                ),
                Style::default().fg(Color::LightCyan),
            ),
        ]),
    ];
    if matches!(discovery.phase(), Phase::Mining) {
        lines.push(Line::from(vec![Span::styled(
            "The ramp guarantees a block before progress hits 100%.",
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        )]));
    }
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    f.render_widget(paragraph, segments[1]);
}

fn draw_fleet(f: &mut Frame<'_>, area: Rect, app: &App) {
    let block = pane_block("Fleet", app.focus == PaneFocus::Fleet);
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let profile = app.sim.fleet().aggregate();
    let cost = daily_cost_fiat(profile.power, app.sim.electricity_rate());
    let header = Paragraph::new(vec![Line::from(vec![
        Span::styled("Total ", Style::default().fg(Color::Gray)),
        Span::styled(
            format_hashrate(profile.hashrate),
            Style::default().fg(Color::LightGreen),
        ),
        Span::raw(format!("  |  {}", format_power(profile.power))),
        Span::raw(format!("  |  power bill {:.2}₵/day", cost)),
        Span::raw(format!(
            "  |  {}/{} active",
            app.sim.fleet().active_count(),
            app.sim.fleet().len()
        )),
    ])]);

    let segments = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(app.sim.catalog().hardware.len() as u16 + 1),
            Constraint::Min(0),
        ])
        .split(inner);
    f.render_widget(header, segments[0]);

    let shop_items: Vec<ListItem> = app
        .sim
        .catalog()
        .hardware
        .iter()
        .map(|template| {
            let content = Line::from(vec![
                Span::styled(
                    format!("{:<16}", template.name),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>6.2} ⛏", template.price),
                    Style::default().fg(Color::LightCyan),
                ),
                Span::raw(format!("  {:>10}", format_hashrate(template.hashrate))),
                Span::raw(format!("  {:>8}", format_power(template.power))),
            ]);
            ListItem::new(vec![content])
        })
        .collect();
    let shop = List::new(shop_items)
        .block(Block::default().borders(Borders::NONE))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    let mut shop_state = ListState::default();
    shop_state.select(Some(app.selected_hardware));
    f.render_stateful_widget(shop, segments[1], &mut shop_state);

    if app.sim.fleet().is_empty() {
        let placeholder = Paragraph::new("No rigs yet. ←→ pick a model, Enter to buy.")
            .wrap(Wrap { trim: true });
        f.render_widget(placeholder, segments[2]);
        return;
    }

    let unit_items: Vec<ListItem> = app
        .sim
        .fleet()
        .units()
        .iter()
        .map(|unit| {
            let (dot, dot_color) = if unit.is_active() {
                ("●", Color::LightGreen)
            } else {
                ("○", Color::DarkGray)
            };
            let content = Line::from(vec![
                Span::styled(dot.to_string(), Style::default().fg(dot_color)),
                Span::raw(" "),
                Span::styled(unit.id().to_string(), Style::default().fg(Color::LightCyan)),
                Span::raw(" "),
                Span::styled(
                    format!("{:<16}", unit.name()),
                    Style::default().fg(Color::White),
                ),
                Span::raw(format!("{:>10}", format_hashrate(unit.effective_hashrate()))),
                Span::raw(format!("  {:>8}", format_power(unit.effective_power()))),
                Span::raw(format!("  {:>4.1}°C", unit.effective_thermals())),
                Span::raw(format!("  +{}", unit.upgrade_count())),
            ]);
            ListItem::new(vec![content])
        })
        .collect();
    let units = List::new(unit_items)
        .block(Block::default().borders(Borders::NONE))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    let mut unit_state = ListState::default();
    unit_state.select(Some(app.selected_unit.min(app.sim.fleet().len() - 1)));
    f.render_stateful_widget(units, segments[2], &mut unit_state);
}

fn draw_strategy(f: &mut Frame<'_>, area: Rect, app: &App) {
    let block = pane_block("Halving Strategy", app.focus == PaneFocus::Strategy);
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let Some(review) = app.sim.halving_review() else {
        let placeholder = Paragraph::new(
            "No halving yet. When the block reward halves, compare strategies here.",
        )
        .wrap(Wrap { trim: true });
        f.render_widget(placeholder, inner);
        return;
    };

    let mut lines = vec![Line::from(vec![
        Span::styled("Before halving  ", Style::default().fg(Color::Gray)),
        Span::raw(format!("(day {})", review.halving_tick)),
    ])];
    lines.extend(snapshot_lines(&review.pre));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("[1] "),
        Span::styled(
            HalvingPolicy::UpgradeHardware.label(),
            Style::default().fg(Color::White),
        ),
        Span::raw("  [2] "),
        Span::styled(
            HalvingPolicy::ExpandFleet.label(),
            Style::default().fg(Color::White),
        ),
        Span::raw("  [3] "),
        Span::styled(
            HalvingPolicy::ReduceOperations.label(),
            Style::default().fg(Color::White),
        ),
    ]));

    if let Some((policy, post)) = review.chosen() {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![Span::styled(
            format!("After halving — {}", policy.label()),
            Style::default().fg(Color::Yellow),
        )]));
        lines.extend(snapshot_lines(post));
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    f.render_widget(paragraph, inner);
}

fn snapshot_lines(snapshot: &ProfitSnapshot) -> Vec<Line<'static>> {
    let roi = match snapshot.roi {
        Roi::Days(days) => format!("{:.0} days", days),
        Roi::Unbounded => "never (unprofitable)".to_string(),
    };
    vec![
        Line::from(vec![
            Span::styled("Hashrate ", Style::default().fg(Color::Gray)),
            Span::raw(format_hashrate(snapshot.hashrate)),
            Span::raw(format!(
                "  |  {} rigs @ {:.2}₵/day",
                snapshot.units, snapshot.cost_per_unit_fiat
            )),
            Span::raw(format!("  |  reward {:.4} ⛏", snapshot.block_reward)),
        ]),
        Line::from(vec![
            Span::styled("Revenue ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{:.4} ⛏/day", snapshot.revenue_per_day),
                Style::default().fg(Color::LightGreen),
            ),
            Span::raw(format!("  |  cost {:.4} ⛏/day", snapshot.cost_per_day)),
            Span::raw("  |  profit "),
            Span::styled(
                format!("{:.4} ⛏/day", snapshot.profit_per_day),
                Style::default().fg(if snapshot.profit_per_day >= 0.0 {
                    Color::LightGreen
                } else {
                    Color::LightRed
                }),
            ),
            Span::raw(format!("  |  ROI {}", roi)),
        ]),
    ]
}

fn draw_blocks(f: &mut Frame<'_>, area: Rect, app: &App) {
    let block = pane_block("Blocks", app.focus == PaneFocus::Blocks);
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let records = app.sim.blocks();
    if records.is_empty() {
        let paragraph = Paragraph::new("No blocks found yet. Fire up the rigs.")
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, inner);
        return;
    }

    let visible_height = inner.height.saturating_sub(1) as usize;
    let start = app.block_scroll.min(records.len());
    let end = (start + visible_height.max(1)).min(records.len());
    let items: Vec<ListItem> = records[start..end].iter().map(build_block_item).collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::NONE))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(list, inner);
}

fn build_block_item(record: &BlockRecord) -> ListItem<'static> {
    let line = Line::from(vec![
        Span::styled(
            record.found_on.format("%Y-%m-%d").to_string(),
            Style::default().fg(Color::Gray),
        ),
        Span::raw("  "),
        Span::styled(record.header_id.clone(), Style::default().fg(Color::LightCyan)),
        Span::raw("  ⛏"),
        Span::styled(
            format!("{:.4}", record.reward),
            Style::default().fg(Color::White),
        ),
        Span::raw("  ≈"),
        Span::styled(
            format!("{:.0}₵", record.fiat_value),
            Style::default().fg(Color::LightGreen),
        ),
        Span::raw("  L"),
        Span::styled(
            format!("{}", record.difficulty_level),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw("  "),
        Span::styled(
            format_hashes(record.nonce),
            Style::default().fg(Color::Gray),
        ),
    ]);
    ListItem::new(vec![line])
}

fn draw_ticker(f: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .title("Market")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(inner);

    let market = app.sim.market();
    let balance = app.sim.ledger().balance();
    let paused = if app.sim.clock().is_running() { "" } else { "  ⏸ paused" };
    let mut spans = vec![
        Span::styled(
            format!("Day {} · {}", app.sim.clock().tick(), app.sim.current_date()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("{:.0}₵/⛏", market.price()),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw(" ("),
        Span::styled(
            format_price_delta(market.last_delta()),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(")  |  "),
        Span::styled(
            format!("{:.4} ⛏", balance),
            Style::default().fg(Color::LightCyan),
        ),
        Span::raw("  ≈"),
        Span::styled(
            format!("{:.0}₵", balance * market.price()),
            Style::default().fg(Color::LightGreen),
        ),
    ];
    if !paused.is_empty() {
        spans.push(Span::styled(paused, Style::default().fg(Color::LightRed)));
    }
    let paragraph = Paragraph::new(Line::from(spans)).alignment(Alignment::Left);
    f.render_widget(paragraph, columns[0]);

    let history: Vec<u64> = market.history().iter().map(|price| *price as u64).collect();
    let sparkline = Sparkline::default()
        .data(&history)
        .style(Style::default().fg(Color::Yellow));
    f.render_widget(sparkline, columns[1]);
}

fn draw_footer(f: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Ops & Feed")
        .border_style(Style::default().fg(Color::Gray));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(inner);

    let instruction_lines = vec![
        Line::from("Tab cycle focus | P pause clock | Q quit"),
        Line::from("Mining: Enter start  C cancel   Strategy: 1/2/3 choose"),
        Line::from("Fleet: ←→ model  Enter buy  ↑↓ rig  T toggle  U upgrade"),
    ];
    let instruction = Paragraph::new(instruction_lines).wrap(Wrap { trim: true });
    f.render_widget(instruction, columns[0]);

    let mut message_lines: Vec<Line> = Vec::new();
    for msg in app.messages.iter() {
        message_lines.push(Line::from(Span::raw(msg.clone())));
    }
    if message_lines.is_empty() {
        message_lines.push(Line::from(Span::styled(
            "Awaiting signal...",
            Style::default().fg(Color::DarkGray),
        )));
    }
    let feed = Paragraph::new(message_lines).wrap(Wrap { trim: true });
    f.render_widget(feed, columns[1]);
}

fn pane_block<'a>(title: &'a str, focused: bool) -> Block<'a> {
    let border_style = if focused {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    Block::default()
        .title(Span::styled(title, Style::default().fg(Color::White)))
        .borders(Borders::ALL)
        .border_style(border_style)
}
