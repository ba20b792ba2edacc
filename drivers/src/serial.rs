//! COM1 driver and klog backend.
//!
//! Early boot logs through the raw fallback in `orion_lib::ports`; once this
//! driver initialises it registers a locked backend so concurrent printers
//! (IRQ handlers included) cannot interleave log lines.

use core::fmt;

use orion_lib::io::Port;
use orion_lib::ports::{
    COM1, UART_FCR_14_BYTE_THRESHOLD, UART_FCR_CLEAR_RX, UART_FCR_CLEAR_TX, UART_FCR_ENABLE_FIFO,
    UART_LCR_DLAB, UART_MCR_AUX2, UART_MCR_DTR, UART_MCR_RTS, UART_REG_FCR, UART_REG_IER,
    UART_REG_LCR, UART_REG_MCR, serial_write_bytes,
};
use orion_lib::{IrqMutex, klog_register_backend};

static TX_LOCK: IrqMutex<()> = IrqMutex::new(());

fn configure(base: Port<u8>) {
    unsafe {
        base.offset(UART_REG_IER).write(0x00);
        base.offset(UART_REG_LCR).write(UART_LCR_DLAB);
        // 38400 baud: divisor 3.
        base.offset(0).write(0x03);
        base.offset(1).write(0x00);
        // 8n1.
        base.offset(UART_REG_LCR).write(0x03);
        base.offset(UART_REG_FCR).write(
            UART_FCR_ENABLE_FIFO | UART_FCR_CLEAR_RX | UART_FCR_CLEAR_TX
                | UART_FCR_14_BYTE_THRESHOLD,
        );
        base.offset(UART_REG_MCR).write(UART_MCR_DTR | UART_MCR_RTS | UART_MCR_AUX2);
    }
}

fn backend(args: fmt::Arguments<'_>) {
    struct Writer;

    impl fmt::Write for Writer {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            unsafe { serial_write_bytes(COM1, s.as_bytes()) };
            Ok(())
        }
    }

    let _guard = TX_LOCK.lock();
    let _ = fmt::write(&mut Writer, args);
    unsafe { serial_write_bytes(COM1, b"\n") };
}

pub fn init() {
    configure(COM1);
    klog_register_backend(backend);
}
