// All multi-byte fields are big-endian (network byte order). Host-native values never leave this
// module in any other form.

pub struct Reader<'a> {
    buffer: &'a [u8],
    bytes_read: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            bytes_read: 0,
        }
    }

    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    pub fn read_u32(&mut self) -> u32 {
        let mut bytes = [0; 4];
        self.read_into(&mut bytes);
        u32::from_be_bytes(bytes)
    }

    pub fn read_into(&mut self, out: &mut [u8]) {
        let end = self.bytes_read + out.len();
        out.copy_from_slice(&self.buffer[self.bytes_read..end]);
        self.bytes_read = end;
    }
}

pub struct Writer<'a> {
    buffer: &'a mut [u8],
    bytes_written: usize,
}

impl<'a> Writer<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            bytes_written: 0,
        }
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_slice(&value.to_be_bytes());
    }

    pub fn write_slice(&mut self, bytes: &[u8]) {
        let end = self.bytes_written + bytes.len();
        self.buffer[self.bytes_written..end].copy_from_slice(bytes);
        self.bytes_written = end;
    }
}

/// A record with a fixed encoded size. Implementors may assume the buffer holds at least `SIZE`
/// bytes; [`Serial`] checks this before calling in.
pub trait BlockSerial {
    const SIZE: usize;

    fn read(rd: &mut Reader) -> Self
    where
        Self: Sized;

    fn write(wr: &mut Writer, obj: &Self);
}

pub trait Serial {
    fn read(buffer: &[u8]) -> Option<(Self, usize)>
    where
        Self: Sized;

    fn write(buffer: &mut [u8], obj: &Self) -> Option<usize>;
}

impl<T> Serial for T
where
    T: BlockSerial,
{
    fn read(buffer: &[u8]) -> Option<(Self, usize)> {
        if buffer.len() < T::SIZE {
            return None;
        }

        let rd = &mut Reader::new(buffer);

        let obj = T::read(rd);

        debug_assert_eq!(rd.bytes_read(), T::SIZE);

        Some((obj, rd.bytes_read()))
    }

    fn write(buffer: &mut [u8], obj: &Self) -> Option<usize> {
        if buffer.len() < T::SIZE {
            return None;
        }

        let mut wr = Writer::new(buffer);

        T::write(&mut wr, obj);

        debug_assert_eq!(wr.bytes_written(), T::SIZE);

        Some(wr.bytes_written())
    }
}
