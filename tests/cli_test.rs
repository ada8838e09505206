use naval_p2p::cli::{
    apply_setup_command, parse_game_command, parse_setup_command, render_board, render_score,
    render_target_grid, CommandError, GameCommand, SetupCommand,
};
use naval_p2p::{BoardModel, Cell, Intent, Orientation, PlacementError, Score, ShotRecord};

#[test]
fn setup_commands_parse() {
    assert_eq!(
        parse_setup_command("place carrier 0 0 v"),
        Ok(SetupCommand::Place {
            ship: "carrier".into(),
            origin: Cell::new(0, 0),
            orientation: Some(Orientation::Vertical),
        })
    );
    assert_eq!(
        parse_setup_command("  P patrol 3 4 "),
        Ok(SetupCommand::Place {
            ship: "patrol".into(),
            origin: Cell::new(3, 4),
            orientation: None,
        })
    );
    assert_eq!(parse_setup_command("rm 2 2"), Ok(SetupCommand::Remove(Cell::new(2, 2))));
    assert_eq!(parse_setup_command("random 9"), Ok(SetupCommand::Random(Some(9))));
    assert_eq!(parse_setup_command("random"), Ok(SetupCommand::Random(None)));
    assert_eq!(parse_setup_command("START"), Ok(SetupCommand::Start));
}

#[test]
fn setup_command_errors() {
    assert_eq!(parse_setup_command("   "), Err(CommandError::Empty));
    assert!(matches!(parse_setup_command("launch"), Err(CommandError::Unknown(_))));
    assert!(matches!(parse_setup_command("place carrier 1"), Err(CommandError::Usage(_))));
    assert_eq!(
        parse_setup_command("remove x 1"),
        Err(CommandError::BadNumber("x".into()))
    );
    assert_eq!(
        parse_setup_command("place carrier 1 1 d"),
        Err(CommandError::Placement(PlacementError::UnknownOrientation("d".into())))
    );
}

#[test]
fn game_commands_parse() {
    assert_eq!(
        parse_game_command("target 4 7"),
        Ok(GameCommand::Intent(Intent::SelectTarget(Cell::new(4, 7))))
    );
    assert_eq!(parse_game_command("auto"), Ok(GameCommand::Intent(Intent::ToggleAutoFire)));
    assert_eq!(parse_game_command("exit"), Ok(GameCommand::Intent(Intent::RequestExit)));
    assert_eq!(parse_game_command("confirm"), Ok(GameCommand::Intent(Intent::ConfirmExit)));
    assert_eq!(parse_game_command("cancel"), Ok(GameCommand::Intent(Intent::CancelExit)));
    assert_eq!(parse_game_command("score"), Ok(GameCommand::Score));
    assert!(matches!(parse_game_command("target 4"), Err(CommandError::Usage(_))));
}

#[test]
fn board_shows_ships_and_incoming_shots() {
    let mut board = BoardModel::new();
    board.place("patrol", Cell::new(0, 0), Orientation::Horizontal).unwrap();
    let mut incoming = ShotRecord::default();
    incoming.record_hit(Cell::new(1, 0));
    incoming.record_miss(Cell::new(5, 5));

    let plain = render_board(&board, None);
    let rows: Vec<&str> = plain.lines().collect();
    assert_eq!(rows.len(), 11);
    assert!(rows[1].starts_with(" 0  P P ."));

    let shot = render_board(&board, Some(&incoming));
    let rows: Vec<&str> = shot.lines().collect();
    assert!(rows[1].starts_with(" 0  P X ."));
    assert_eq!(rows[6].chars().filter(|&c| c == 'o').count(), 1);
}

#[test]
fn target_grid_marks_aim() {
    let mut outgoing = ShotRecord::default();
    outgoing.record_miss(Cell::new(0, 0));
    outgoing.record_hit(Cell::new(1, 0));
    let text = render_target_grid(&outgoing, Some(Cell::new(2, 0)));
    assert!(text.lines().nth(1).unwrap().starts_with(" 0  o X +"));
}

#[test]
fn setup_commands_mutate_board() {
    let mut board = BoardModel::new();
    let place = parse_setup_command("place bomber 2 2 h").unwrap();
    apply_setup_command(&mut board, &place).unwrap();
    assert!(board.placement("bomber").is_some());

    let clash = parse_setup_command("place patrol 3 1 v").unwrap();
    assert!(matches!(
        apply_setup_command(&mut board, &clash),
        Err(CommandError::Placement(PlacementError::Overlaps { .. }))
    ));

    let removed = apply_setup_command(&mut board, &SetupCommand::Remove(Cell::new(4, 2))).unwrap();
    assert!(removed.starts_with("removed bomber"));
    let empty = apply_setup_command(&mut board, &SetupCommand::Remove(Cell::new(4, 2))).unwrap();
    assert!(empty.starts_with("nothing at"));

    apply_setup_command(&mut board, &SetupCommand::Random(Some(3))).unwrap();
    assert!(board.is_fully_placed());
    apply_setup_command(&mut board, &SetupCommand::Reset).unwrap();
    assert!(board.placements().next().is_none());
}

#[test]
fn score_lists_each_peer() {
    let mut score = Score::default();
    score.shots_fired = 3;
    score.hits_by_peer.insert("10.0.0.2".parse().unwrap(), 2);
    score.destroyed_by_peer.insert("10.0.0.2".parse().unwrap(), 1);
    score.distinct_peers_hit = 1;
    score.final_score = 1;
    let text = render_score(&score);
    assert!(text.contains("shots fired: 3"));
    assert!(text.contains("10.0.0.2: 2 hit(s), 1 sunk"));
    assert!(text.contains("final score: 1"));
}
