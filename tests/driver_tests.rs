//! State machine and transmit path behavior against the in-memory radio.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sx127x_rs::radio::registers::{
    OP_MODE_MASK, REG_LR_SYMB_TIMEOUT_LSB, REG_OP_MODE, VERSION_SX1276,
};
use sx127x_rs::radio::IrqFlags;
use sx127x_rs::{
    DriverError, Event, InterruptSource, ManualTimer, MemoryPort, Opt, OptValue, PortOp,
    RadioState, StateCommand, Sx127x,
};

type TestRadio = Sx127x<MemoryPort, ManualTimer>;

fn radio() -> TestRadio {
    let mut radio = Sx127x::new(MemoryPort::new(), ManualTimer::new(), ManualTimer::new());
    radio.init().unwrap();
    radio
}

fn capture_events(radio: &mut TestRadio) -> Arc<Mutex<Vec<Event>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    radio.set_event_callback(move |event| sink.lock().unwrap().push(event));
    events
}

#[test]
fn init_leaves_radio_asleep() {
    let mut radio = radio();
    assert_eq!(radio.state().unwrap(), RadioState::Sleep);
    assert_eq!(radio.tracked_state(), RadioState::Sleep);
    assert_eq!(radio.version().unwrap(), VERSION_SX1276);
}

#[test]
fn standby_and_receive_transitions() {
    let mut radio = radio();
    radio.set_state(StateCommand::Standby).unwrap();
    assert_eq!(radio.state().unwrap(), RadioState::Standby);

    radio.set_state(StateCommand::Rx).unwrap();
    assert_eq!(radio.tracked_state(), RadioState::Receiving);
    assert_eq!(radio.state().unwrap(), RadioState::Receiving);
    assert!(radio.rx_timer().is_armed());
}

#[test]
fn single_receive_uses_its_own_mode() {
    let mut radio = radio();
    radio.set_rx_single(true);
    radio.set_state(StateCommand::Rx).unwrap();
    assert_eq!(radio.tracked_state(), RadioState::ReceivingSingle);
    // RxSingle raw mode, distinct from continuous receive
    assert_eq!(radio.port().reg(REG_OP_MODE) & OP_MODE_MASK, 0x06);
}

#[test]
fn idle_clears_the_symbol_window_bound() {
    let mut radio = radio();
    radio.set_opt(Opt::WindowTimeout, OptValue::U16(42)).unwrap();
    radio.set_state(StateCommand::Idle).unwrap();
    assert_eq!(radio.settings().window_timeout, 0);
    assert_eq!(radio.port().reg(REG_LR_SYMB_TIMEOUT_LSB), 0);
    assert_eq!(radio.tracked_state(), RadioState::Receiving);
}

#[test]
fn send_rejected_while_transmission_running() {
    let mut radio = radio();
    radio.send(&[b"first".as_slice()]).unwrap();
    assert_eq!(radio.tracked_state(), RadioState::Transmitting);
    let staged = radio.port().tx_data().to_vec();
    let armed = radio.tx_timer().times_armed();

    let err = radio.send(&[b"second".as_slice()]).unwrap_err();
    assert!(matches!(err, DriverError::Busy));
    // The rejected send must not disturb the FIFO or the deadline.
    assert_eq!(radio.port().tx_data(), staged.as_slice());
    assert_eq!(radio.tx_timer().times_armed(), armed);
}

#[test]
fn send_stages_fifo_before_arming_the_modem() {
    let mut radio = radio();
    radio.set_state(StateCommand::Standby).unwrap();
    radio.port_mut().clear_journal();

    radio.send(&[b"ab".as_slice(), b"c".as_slice()]).unwrap();

    let regs: Vec<u8> = radio
        .port()
        .journal()
        .iter()
        .map(|op| match op {
            PortOp::Write { reg, .. } => *reg,
            PortOp::WriteBurst { reg, .. } => *reg,
            PortOp::Reset => panic!("unexpected reset"),
        })
        .collect();
    use sx127x_rs::radio::registers::{
        REG_DIO_MAPPING1, REG_FIFO, REG_LR_FIFO_ADDR_PTR, REG_LR_FIFO_TX_BASE_ADDR,
        REG_LR_IRQ_FLAGS_MASK, REG_LR_PAYLOAD_LENGTH,
    };
    assert_eq!(
        regs,
        vec![
            REG_LR_PAYLOAD_LENGTH,
            REG_LR_FIFO_TX_BASE_ADDR,
            REG_LR_FIFO_ADDR_PTR,
            REG_FIFO,
            REG_FIFO,
            REG_LR_IRQ_FLAGS_MASK,
            REG_DIO_MAPPING1,
            REG_OP_MODE,
        ]
    );
    assert_eq!(radio.port().tx_data(), b"abc");
}

#[test]
fn transmit_complete_dispatch() {
    let mut radio = radio();
    let events = capture_events(&mut radio);
    radio.send(&[b"payload".as_slice()]).unwrap();
    assert!(radio.tx_timer().is_armed());

    radio.port_mut().latch_irq(IrqFlags::TX_DONE);
    radio.raise_interrupt(InterruptSource::Dio0);
    radio.dispatch().unwrap();

    assert_eq!(*events.lock().unwrap(), vec![Event::TransmitComplete]);
    assert_eq!(radio.tracked_state(), RadioState::Standby);
    assert!(!radio.tx_timer().is_armed());
    assert!(!IrqFlags::from_bits_truncate(
        radio.port().reg(sx127x_rs::radio::registers::REG_LR_IRQ_FLAGS)
    )
    .contains(IrqFlags::TX_DONE));
}

#[test]
fn transmit_deadline_falls_back_to_standby() {
    let mut radio = radio();
    let events = capture_events(&mut radio);
    radio.send(&[b"payload".as_slice()]).unwrap();

    radio.on_tx_timeout().unwrap();

    assert_eq!(*events.lock().unwrap(), vec![Event::Timeout]);
    assert_eq!(radio.tracked_state(), RadioState::Standby);
    assert!(!radio.tx_timer().is_armed());
}

#[test]
fn receive_deadline_keeps_continuous_receiver_listening() {
    let mut radio = radio();
    let events = capture_events(&mut radio);
    radio.set_state(StateCommand::Idle).unwrap();

    radio.on_rx_timeout().unwrap();

    assert_eq!(*events.lock().unwrap(), vec![Event::Timeout]);
    assert_eq!(radio.tracked_state(), RadioState::Receiving);
}

#[test]
fn receive_deadline_stops_single_receiver() {
    let mut radio = radio();
    let events = capture_events(&mut radio);
    radio.set_rx_single(true);
    radio.set_state(StateCommand::Rx).unwrap();

    radio.on_rx_timeout().unwrap();

    assert_eq!(*events.lock().unwrap(), vec![Event::Timeout]);
    assert_eq!(radio.tracked_state(), RadioState::Standby);
    assert!(!radio.rx_timer().is_armed());
}

#[test]
fn sleep_disarms_both_deadlines() {
    let mut radio = radio();
    radio.set_state(StateCommand::Rx).unwrap();
    assert!(radio.rx_timer().is_armed());

    radio.set_state(StateCommand::Sleep).unwrap();
    assert_eq!(radio.state().unwrap(), RadioState::Sleep);
    assert!(!radio.rx_timer().is_armed());
    assert!(!radio.tx_timer().is_armed());
}

#[test]
fn custom_rx_deadline_is_armed_on_entry() {
    let mut radio = radio();
    radio.set_rx_timeout(Duration::from_millis(250));
    radio.set_state(StateCommand::Rx).unwrap();
    assert_eq!(radio.rx_timer().deadline(), Some(Duration::from_millis(250)));
}

#[test]
fn zero_rx_deadline_means_no_timer() {
    let mut radio = radio();
    radio.set_rx_timeout(Duration::ZERO);
    radio.set_state(StateCommand::Rx).unwrap();
    assert!(!radio.rx_timer().is_armed());
}

#[test]
fn state_query_follows_raw_operating_mode() {
    let mut radio = radio();
    for (raw, expected) in [
        (0x00, RadioState::Sleep),
        (0x01, RadioState::Standby),
        (0x02, RadioState::Transmitting), // frequency synthesis for tx
        (0x03, RadioState::Transmitting),
        (0x04, RadioState::Receiving), // frequency synthesis for rx
        (0x05, RadioState::Receiving),
        (0x06, RadioState::Receiving),
        (0x07, RadioState::Standby), // cad scan reads as standby
    ] {
        radio.port_mut().set_reg(REG_OP_MODE, 0x80 | raw);
        assert_eq!(radio.state().unwrap(), expected, "raw mode {raw:#04x}");
    }
}

#[test]
fn unknown_state_command_is_rejected() {
    for raw in 0..=5u8 {
        assert!(StateCommand::try_from(raw).is_ok());
    }
    assert!(matches!(
        StateCommand::try_from(6),
        Err(DriverError::Unsupported)
    ));
}

#[test]
fn reset_restores_power_on_registers() {
    let mut radio = radio();
    radio.set_channel(433_000_000).unwrap();
    radio.set_state(StateCommand::Rx).unwrap();

    radio.set_state(StateCommand::Reset).unwrap();

    assert_eq!(radio.tracked_state(), RadioState::Standby);
    assert!(!radio.rx_timer().is_armed());
    assert_eq!(radio.port().reg(REG_OP_MODE), 0x01);
}
